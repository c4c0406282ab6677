//! RADIUS Protocol Codec
//!
//! The subset of RFC 2865 and RFC 2869 needed by an authentication gateway
//! that answers Access-Request packets with Access-Accept or Access-Reject.
//!
//! # Features
//!
//! - Packet encoding and decoding
//! - User-Password hiding (RFC 2865 Section 5.2)
//! - Response Authenticator calculation
//! - Message-Authenticator (HMAC-MD5) calculation and verification
//! - Response construction correlated to a request
//!
//! # Example
//!
//! ```rust
//! use radius_proto::{Attribute, AttributeType, Code, Packet};
//! use radius_proto::auth::{encrypt_user_password, generate_request_authenticator};
//!
//! let req_auth = generate_request_authenticator();
//! let mut request = Packet::new(Code::AccessRequest, 7, req_auth);
//! request.add_attribute(
//!     Attribute::string(AttributeType::UserName as u8, "alice@example.com").unwrap(),
//! );
//! let hidden = encrypt_user_password("hunter2", b"s3cret", &req_auth);
//! request.add_attribute(Attribute::new(AttributeType::UserPassword as u8, hidden).unwrap());
//!
//! let bytes = request.encode().unwrap();
//! let decoded = Packet::decode(&bytes).unwrap();
//! assert_eq!(decoded.identifier, 7);
//!
//! let mut reply = Packet::reply_to(&decoded, Code::AccessReject);
//! reply.sign_response(&decoded, b"s3cret").unwrap();
//! ```

pub mod attributes;
pub mod auth;
pub mod message_auth;
pub mod packet;

pub use attributes::{Attribute, AttributeType};
pub use auth::{
    calculate_response_authenticator, decrypt_user_password, encrypt_user_password,
    generate_request_authenticator, verify_response_authenticator, PasswordError,
};
pub use message_auth::{calculate_message_authenticator, verify_message_authenticator};
pub use packet::{Code, Packet, PacketError};
