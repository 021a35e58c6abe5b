pub mod enums;
pub mod qr_codes;
pub mod qr_styles;
pub mod subscriptions;
