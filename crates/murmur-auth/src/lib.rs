// SPDX-FileCopyrightText: 2026 Murmur Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Authentication for the Murmur API.
//!
//! Users log in with a one-time passcode sent to their mobile number
//! ([`OtpService`]) and receive an HS256 access token ([`TokenIssuer`]).
//! [`JwtIdentity`] resolves bearer tokens back into principals.

pub mod jwt;
mod mobile;
pub mod otp;

pub use jwt::{AccessClaims, JwtIdentity, TokenIssuer};
pub use mobile::normalize_mobile_number;
pub use otp::{IssuedOtp, OtpPurpose, OtpService};
