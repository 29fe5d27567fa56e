//! BPF (Berkeley Packet Filter) expressions for the capture handle

/// TCP traffic to or from a port
///
/// Matching both directions captures the client request and the server
/// response on the same handle, e.g. for 3306:
/// `tcp and ((src port 3306) or (dst port 3306))`
pub fn tcp_port_filter(port: u16) -> String {
    format!("tcp and ((src port {}) or (dst port {}))", port, port)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mysql_filter() {
        assert_eq!(
            tcp_port_filter(3306),
            "tcp and ((src port 3306) or (dst port 3306))"
        );
    }

    #[test]
    fn test_port_in_both_directions() {
        for port in [1u16, 80, 5432, 65535] {
            let filter = tcp_port_filter(port);
            assert!(filter.starts_with("tcp and "));
            assert!(filter.contains(&format!("(src port {})", port)));
            assert!(filter.contains(&format!("(dst port {})", port)));
        }
    }

    #[test]
    fn test_deterministic() {
        assert_eq!(tcp_port_filter(1433), tcp_port_filter(1433));
    }
}
