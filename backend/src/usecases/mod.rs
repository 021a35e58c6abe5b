pub mod billing;
pub mod entitlement;
pub mod qr_codes;

#[cfg(test)]
pub(crate) mod test_support;
