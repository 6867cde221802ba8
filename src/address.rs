//! Flow address helpers.

/// Strip the `0x` display prefix from an address.
///
/// The language server expects bare hex addresses on the wire, while the
/// emulator and the UI generally show them with the `0x` prefix.
pub fn strip_address_prefix(address: &str) -> &str {
    address.strip_prefix("0x").unwrap_or(address)
}

/// Add the `0x` display prefix to an address if it is missing.
pub fn with_address_prefix(address: &str) -> String {
    if address.starts_with("0x") {
        address.to_string()
    } else {
        format!("0x{}", address)
    }
}
