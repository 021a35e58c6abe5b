pub mod billing;
pub mod qr_codes;
