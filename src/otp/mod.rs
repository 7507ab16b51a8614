//! OTP / Verification Gate
//!
//! Single-use six-digit codes gating registration, coupon redemption and
//! password reset. A verified registration code turns into a short-lived
//! verification token (the session id).

pub mod email;
pub mod gate;
pub mod models;

pub use email::{EmailMessage, EmailSender, HttpEmailSender, LogEmailSender, MemoryOutbox};
pub use gate::{OtpGate, spawn_sweeper};
pub use models::{OtpPurpose, VerificationSession};
