use super::Code;
use crate::attributes::{Attribute, AttributeType};
use crate::auth::calculate_response_authenticator;
use crate::message_auth::calculate_message_authenticator;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum PacketError {
    #[error("Invalid packet length: {0}")]
    InvalidLength(usize),
    #[error("Invalid packet code: {0}")]
    InvalidCode(u8),
    #[error("Attribute error: {0}")]
    AttributeError(String),
    #[error("Packet too large: {0} bytes")]
    PacketTooLarge(usize),
}

/// RADIUS Packet structure as defined in RFC 2865 Section 3
///
/// ```text
///  0                   1                   2                   3
///  0 1 2 3 4 5 6 7 8 9 0 1 2 3 4 5 6 7 8 9 0 1 2 3 4 5 6 7 8 9 0 1
/// +-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+
/// |     Code      |  Identifier   |            Length             |
/// +-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+
/// |                         Authenticator                         |
/// +-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+
/// |  Attributes ...
/// +-+-+-+-+-+-+-+-+-+-+-+-+-
/// ```
#[derive(Debug, Clone)]
pub struct Packet {
    pub code: Code,
    pub identifier: u8,
    pub authenticator: [u8; 16],
    pub attributes: Vec<Attribute>,
}

impl Packet {
    /// Header size: code, identifier, length, authenticator
    pub const HEADER_SIZE: usize = 20;
    /// Minimum RADIUS packet size
    pub const MIN_PACKET_SIZE: usize = Self::HEADER_SIZE;
    /// Maximum RADIUS packet size (RFC 2865 Section 3)
    pub const MAX_PACKET_SIZE: usize = 4096;

    pub fn new(code: Code, identifier: u8, authenticator: [u8; 16]) -> Self {
        Packet {
            code,
            identifier,
            authenticator,
            attributes: Vec::new(),
        }
    }

    /// Start a response to `request`
    ///
    /// The response reuses the request identifier and carries every
    /// Proxy-State attribute of the request, in order (RFC 2865 Section 5.33).
    /// The authenticator is left zeroed until [`Packet::sign_response`].
    pub fn reply_to(request: &Packet, code: Code) -> Self {
        let mut response = Packet::new(code, request.identifier, [0u8; 16]);
        response.attributes.extend(
            request
                .attributes
                .iter()
                .filter(|a| a.attr_type == AttributeType::ProxyState as u8)
                .cloned(),
        );
        response
    }

    pub fn add_attribute(&mut self, attribute: Attribute) {
        self.attributes.push(attribute);
    }

    /// Encode packet to bytes
    pub fn encode(&self) -> Result<Vec<u8>, PacketError> {
        let total_length = self.length();
        if total_length > Self::MAX_PACKET_SIZE {
            return Err(PacketError::PacketTooLarge(total_length));
        }

        let mut buffer = Vec::with_capacity(total_length);
        buffer.push(self.code.as_u8());
        buffer.push(self.identifier);
        buffer.extend_from_slice(&(total_length as u16).to_be_bytes());
        buffer.extend_from_slice(&self.authenticator);
        for attr in &self.attributes {
            attr.encode_into(&mut buffer)?;
        }

        Ok(buffer)
    }

    /// Decode packet from bytes
    ///
    /// Octets past the Length field are treated as padding and ignored.
    pub fn decode(data: &[u8]) -> Result<Self, PacketError> {
        if data.len() < Self::MIN_PACKET_SIZE {
            return Err(PacketError::InvalidLength(data.len()));
        }

        let code = Code::from_u8(data[0]).ok_or(PacketError::InvalidCode(data[0]))?;
        let identifier = data[1];
        let length = u16::from_be_bytes([data[2], data[3]]) as usize;

        if !(Self::MIN_PACKET_SIZE..=Self::MAX_PACKET_SIZE).contains(&length) {
            return Err(PacketError::InvalidLength(length));
        }
        if data.len() < length {
            return Err(PacketError::InvalidLength(data.len()));
        }

        let mut authenticator = [0u8; 16];
        authenticator.copy_from_slice(&data[4..Self::HEADER_SIZE]);

        let mut attributes = Vec::new();
        let mut rest = &data[Self::HEADER_SIZE..length];
        while !rest.is_empty() {
            let attr = Attribute::decode(rest)?;
            rest = &rest[attr.encoded_length()..];
            attributes.push(attr);
        }

        Ok(Packet {
            code,
            identifier,
            authenticator,
            attributes,
        })
    }

    /// Length of the encoded packet
    pub fn length(&self) -> usize {
        Self::HEADER_SIZE
            + self
                .attributes
                .iter()
                .map(Attribute::encoded_length)
                .sum::<usize>()
    }

    /// Find first attribute by type
    pub fn find_attribute(&self, attr_type: u8) -> Option<&Attribute> {
        self.attributes.iter().find(|a| a.attr_type == attr_type)
    }

    /// Byte offset of the value of the first attribute of `attr_type`
    /// within the encoded packet
    pub fn attribute_offset(&self, attr_type: u8) -> Option<usize> {
        let mut offset = Self::HEADER_SIZE;
        for attr in &self.attributes {
            if attr.attr_type == attr_type {
                return Some(offset + Attribute::MIN_LENGTH);
            }
            offset += attr.encoded_length();
        }
        None
    }

    /// Finish a response built with [`Packet::reply_to`]
    ///
    /// When the request carried a Message-Authenticator the response gets one
    /// as well (RFC 3579 Section 3.2), computed over the packet holding the
    /// request authenticator. The Response Authenticator is computed last.
    pub fn sign_response(&mut self, request: &Packet, secret: &[u8]) -> Result<(), PacketError> {
        let msg_auth = AttributeType::MessageAuthenticator as u8;
        if request.find_attribute(msg_auth).is_some() {
            self.attributes.retain(|a| a.attr_type != msg_auth);
            self.attributes.push(Attribute::new(msg_auth, vec![0u8; 16])?);
            self.authenticator = request.authenticator;

            let bytes = self.encode()?;
            let mac = calculate_message_authenticator(&bytes, secret);
            if let Some(attr) = self.attributes.last_mut() {
                attr.value = mac.to_vec();
            }
        }

        self.authenticator =
            calculate_response_authenticator(self, &request.authenticator, secret)?;
        Ok(())
    }
}
