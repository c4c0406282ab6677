use radius_proto::{
    auth::{encrypt_user_password, generate_request_authenticator, verify_response_authenticator},
    Attribute, AttributeType, Code, Packet,
};
use std::net::UdpSocket;

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args: Vec<String> = std::env::args().collect();

    if args.len() < 4 {
        eprintln!("Usage: {} <email> <password> <secret> [gateway_addr]", args[0]);
        eprintln!("Example: {} alice@example.com hunter2 s3cret 127.0.0.1:1812", args[0]);
        std::process::exit(1);
    }

    let username = &args[1];
    let password = &args[2];
    let secret = args[3].as_bytes();
    let server_addr = args.get(4).map(|s| s.as_str()).unwrap_or("127.0.0.1:1812");

    println!("RADIUS Gateway Client");
    println!("=====================");
    println!("Gateway: {}", server_addr);
    println!("Username: {}", username);
    println!();

    let socket = UdpSocket::bind("0.0.0.0:0")?;
    socket.connect(server_addr)?;

    let request_auth = generate_request_authenticator();
    let mut packet = Packet::new(Code::AccessRequest, 1, request_auth);
    packet.add_attribute(Attribute::string(AttributeType::UserName as u8, username)?);
    let encrypted_password = encrypt_user_password(password, secret, &request_auth);
    packet.add_attribute(Attribute::new(AttributeType::UserPassword as u8, encrypted_password)?);
    packet.add_attribute(Attribute::new(AttributeType::NasIpAddress as u8, vec![127, 0, 0, 1])?);

    let request_data = packet.encode()?;
    println!("Sending Access-Request ({} bytes)...", request_data.len());
    socket.send(&request_data)?;

    let mut buffer = vec![0u8; Packet::MAX_PACKET_SIZE];
    // The gateway may wait on its SMTP server before answering
    socket.set_read_timeout(Some(std::time::Duration::from_secs(15)))?;

    match socket.recv(&mut buffer) {
        Ok(len) => {
            println!("Received response ({} bytes)", len);
            let response = Packet::decode(&buffer[..len])?;

            if !verify_response_authenticator(&response, &request_auth, secret) {
                println!("\n! Response Authenticator mismatch (wrong shared secret?)");
            }

            match response.code {
                Code::AccessAccept => {
                    println!("\n✓ Authentication SUCCESSFUL!");
                    println!("  Response: Access-Accept");
                }
                Code::AccessReject => {
                    println!("\n✗ Authentication FAILED!");
                    println!("  Response: Access-Reject");
                }
                other => {
                    println!("\n? Unexpected response: {}", other);
                }
            }

            println!("\nResponse Details:");
            println!("  Identifier: {}", response.identifier);
            println!("  Attributes: {}", response.attributes.len());

            Ok(())
        }
        Err(e) => {
            eprintln!("\n✗ No response from gateway: {}", e);
            eprintln!("  Check the shared secret and that the gateway is running on {}", server_addr);
            Err(e.into())
        }
    }
}
