//! Firewall service integration tests over loopback sockets.
//!
//! Run with: cargo test --test lifecycle

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use tokio::io::AsyncReadExt;
use tokio::net::{TcpStream, UdpSocket};

use portgate::bootstrap::{FirewallService, Server};
use portgate::config::{Config, ListenerConfig};
use portgate::firewall::{
    DirectionClassifier, FirewallError, FirewallStats, LoggingEnforcer, RuleRequest,
    StaticAddresses,
};
use portgate::store::InMemoryRuleStore;

/// Test fixture that runs the service on an ephemeral loopback port
struct TestFirewall {
    service: Arc<FirewallService>,
    addr: SocketAddr,
}

impl TestFirewall {
    async fn start() -> Self {
        Self::start_with(16).await
    }

    async fn start_with(queue_capacity: usize) -> Self {
        let service = Arc::new(build_service(ListenerConfig {
            address: "127.0.0.1:0".parse().unwrap(),
            queue_capacity,
            udp_buffer_size: 1024,
        }));
        let addr = service.start().await.expect("start failed");

        Self { service, addr }
    }

    async fn connect(&self) {
        let mut stream = TcpStream::connect(self.addr).await.expect("connect failed");
        // Server closes the connection after inspecting it
        let mut buf = [0u8; 1];
        let _ = tokio::time::timeout(Duration::from_secs(2), stream.read(&mut buf)).await;
    }

    /// Poll until `check` holds for the statistics or the timeout elapses.
    async fn wait_for(&self, check: impl Fn(&FirewallStats) -> bool) -> FirewallStats {
        let deadline = tokio::time::Instant::now() + Duration::from_secs(3);
        loop {
            let stats = self.service.stats();
            if check(&stats) || tokio::time::Instant::now() >= deadline {
                return stats;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
    }
}

fn build_service(listener: ListenerConfig) -> FirewallService {
    let classifier = Arc::new(DirectionClassifier::new(
        StaticAddresses(vec!["127.0.0.1".parse().unwrap()]),
        Duration::from_secs(5),
    ));
    FirewallService::with_components(
        listener,
        Arc::new(InMemoryRuleStore::new()),
        classifier,
        Arc::new(LoggingEnforcer),
    )
}

#[tokio::test]
async fn test_tcp_connection_is_allowed_by_default() {
    let fw = TestFirewall::start().await;

    fw.connect().await;
    let stats = fw.wait_for(|s| s.packets_processed == 1).await;

    assert_eq!(stats.packets_processed, 1);
    assert_eq!(stats.packets_allowed, 1);
    assert_eq!(stats.packets_blocked, 0);

    fw.service.stop().await;
}

#[tokio::test]
async fn test_deny_rule_on_listen_port_blocks() {
    let fw = TestFirewall::start().await;
    fw.service
        .add_rule(RuleRequest::new(fw.addr.port() as i64, "tcp", "deny", "inbound"))
        .unwrap();

    fw.connect().await;
    let stats = fw.wait_for(|s| s.packets_blocked == 1).await;
    assert_eq!(stats.packets_blocked, 1);
    assert_eq!(stats.packets_allowed, 0);

    // The same rule does not cover UDP
    let client = UdpSocket::bind("127.0.0.1:0").await.unwrap();
    client.send_to(b"x", fw.addr).await.unwrap();
    let stats = fw.wait_for(|s| s.packets_allowed == 1).await;
    assert_eq!(stats.packets_allowed, 1);
    assert_eq!(stats.packets_processed, 2);

    fw.service.stop().await;
}

#[tokio::test]
async fn test_udp_datagram_is_echoed_and_counted() {
    let fw = TestFirewall::start().await;

    let client = UdpSocket::bind("127.0.0.1:0").await.unwrap();
    client.send_to(b"hello firewall", fw.addr).await.unwrap();

    let mut buf = [0u8; 64];
    let (n, from) = tokio::time::timeout(Duration::from_secs(2), client.recv_from(&mut buf))
        .await
        .expect("no echo")
        .unwrap();
    assert_eq!(&buf[..n], b"hello firewall");
    assert_eq!(from, fw.addr);

    let stats = fw.wait_for(|s| s.packets_processed == 1).await;
    assert_eq!(stats.packets_allowed, 1);

    fw.service.stop().await;
}

#[tokio::test]
async fn test_start_twice_fails_without_state_change() {
    let fw = TestFirewall::start().await;

    let err = fw.service.start().await.unwrap_err();
    assert!(matches!(err, FirewallError::AlreadyRunning));
    assert!(fw.service.is_running().await);
    assert_eq!(fw.service.local_addr().await, Some(fw.addr));

    fw.service.stop().await;
}

#[tokio::test]
async fn test_no_counting_after_stop() {
    let fw = TestFirewall::start().await;
    fw.connect().await;
    fw.wait_for(|s| s.packets_processed == 1).await;

    fw.service.stop().await;
    fw.service.stop().await;
    assert!(!fw.service.is_running().await);

    // Listener is closed
    assert!(TcpStream::connect(fw.addr).await.is_err());

    tokio::time::sleep(Duration::from_millis(50)).await;
    assert_eq!(fw.service.stats().packets_processed, 1);
}

#[tokio::test]
async fn test_restart_keeps_rules_and_counters() {
    let fw = TestFirewall::start().await;
    fw.connect().await;
    fw.wait_for(|s| s.packets_processed == 1).await;
    fw.service.stop().await;

    let addr = fw.service.start().await.unwrap();
    let mut stream = TcpStream::connect(addr).await.unwrap();
    let mut buf = [0u8; 1];
    let _ = tokio::time::timeout(Duration::from_secs(2), stream.read(&mut buf)).await;

    let stats = fw.wait_for(|s| s.packets_processed == 2).await;
    assert_eq!(stats.packets_processed, 2);

    fw.service.stop().await;
}

#[tokio::test]
async fn test_bind_conflict_leaves_service_stopped() {
    let fw = TestFirewall::start().await;

    let other = build_service(ListenerConfig {
        address: fw.addr,
        queue_capacity: 16,
        udp_buffer_size: 1024,
    });
    let err = other.start().await.unwrap_err();
    assert!(matches!(err, FirewallError::Bind { .. }));
    assert!(!other.is_running().await);
    assert_eq!(other.local_addr().await, None);

    fw.service.stop().await;
}

#[tokio::test]
async fn test_processed_equals_allowed_plus_blocked() {
    let fw = TestFirewall::start_with(64).await;
    fw.service
        .add_rule(RuleRequest::new(fw.addr.port() as i64, "udp", "deny", "both"))
        .unwrap();

    for _ in 0..3 {
        fw.connect().await;
    }
    let client = UdpSocket::bind("127.0.0.1:0").await.unwrap();
    for _ in 0..2 {
        client.send_to(b"x", fw.addr).await.unwrap();
    }

    let stats = fw.wait_for(|s| s.packets_processed == 5).await;
    assert_eq!(stats.packets_processed, 5);
    assert_eq!(stats.packets_allowed, 3);
    assert_eq!(stats.packets_blocked, 2);
    assert_eq!(
        stats.packets_processed,
        stats.packets_allowed + stats.packets_blocked
    );

    fw.service.stop().await;
}

#[tokio::test]
async fn test_server_seeds_rules_from_config() {
    let yaml = r#"
listener:
  address: "127.0.0.1:0"
rules:
  - id: block-telnet
    port: 23
    protocol: tcp
    action: deny
    direction: inbound
"#;
    let config = Config::from_yaml(yaml).unwrap();
    let server = Server::new(config).unwrap();
    let service = server.service();

    let rule = service.rule("block-telnet").expect("seed rule missing");
    assert_eq!(rule.port, 23);
    assert!(!service.is_running().await);
}

#[tokio::test]
async fn test_server_rejects_invalid_seed_rule() {
    let yaml = r#"
rules:
  - { port: 70000, protocol: tcp, action: deny, direction: inbound }
"#;
    let config = Config::from_yaml(yaml).unwrap();
    assert!(Server::new(config).is_err());
}
