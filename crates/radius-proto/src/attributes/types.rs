/// RADIUS attribute types handled by the gateway (RFC 2865, RFC 2869)
///
/// Other attribute types are carried through decoding as raw TLVs and are
/// never interpreted.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum AttributeType {
    /// User-Name (1)
    UserName = 1,
    /// User-Password (2)
    UserPassword = 2,
    /// NAS-IP-Address (4)
    NasIpAddress = 4,
    /// State (24)
    State = 24,
    /// Proxy-State (33), echoed back unmodified in every response
    ProxyState = 33,
    /// Message-Authenticator (80) - RFC 2869
    MessageAuthenticator = 80,
}

