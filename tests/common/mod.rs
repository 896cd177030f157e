#[allow(dead_code)]
pub mod tracing_util {
    use std::sync::Once;

    static INIT: Once = Once::new();

    /// Install a subscriber once so test runs surface server logs when
    /// `RUST_LOG` asks for them.
    pub fn init() {
        INIT.call_once(|| {
            let filter = tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn"));
            let _ = tracing_subscriber::fmt().with_env_filter(filter).try_init();
        });
    }
}

pub mod http {
    use std::io::{Read, Write};
    use std::net::{SocketAddr, TcpStream};
    use std::time::Duration;

    /// Send a raw HTTP request string and return the full raw HTTP response
    /// as a string. The server closes the connection after every response,
    /// so reading to EOF captures everything; the timeout is a safety net.
    pub fn send_request(addr: &SocketAddr, request: &str) -> String {
        let mut stream = TcpStream::connect(addr).unwrap();
        stream
            .set_read_timeout(Some(Duration::from_secs(2)))
            .unwrap();
        stream.write_all(request.as_bytes()).unwrap();

        let mut buf = Vec::new();
        let _ = stream.read_to_end(&mut buf);
        String::from_utf8_lossy(&buf).to_string()
    }

    /// First line of a raw HTTP response.
    #[allow(dead_code)]
    pub fn status_line(response: &str) -> &str {
        response.lines().next().unwrap_or("")
    }

    /// Body of a raw HTTP response (everything after the blank line).
    #[allow(dead_code)]
    pub fn body_of(response: &str) -> &str {
        response
            .split_once("\r\n\r\n")
            .map(|(_, body)| body)
            .unwrap_or("")
    }
}
