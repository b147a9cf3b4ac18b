use serde::{Deserialize, Serialize};
use std::fmt;

pub type NodeId = String;
pub type EdgeId = String;

/// A complete scenario file: simulation settings plus the architecture graph.
#[derive(Clone, Debug, Deserialize, Serialize)]
pub struct Scenario {
    #[serde(default)]
    pub simulation: SimulationSettings,
    pub nodes: Vec<Node>,
    #[serde(default)]
    pub edges: Vec<Edge>,
}

/// Tunable engine constants. Every field has a default so scenario files
/// only need to name what they change.
#[derive(Clone, Debug, Deserialize, Serialize)]
#[serde(default)]
pub struct SimulationSettings {
    pub tick_interval_ms: u64,
    pub max_request_lifetime_ms: u64,
    pub max_history_length: usize,
    pub max_metric_history: usize,
    pub request_mix: RequestMix,
    pub node_overload_failure_chance: f64,
    pub retry_chance: f64,
    pub base_request_size_kb: f64,
    pub max_node_impact: f64,
    pub edge_overload_threshold: f64,
    pub network_congestion_failure_chance: f64,
    pub edge_overload_penalty_ms: f64,
    /// Upper bound on requests a single client emits in one tick.
    pub max_requests_per_tick: u32,
    pub seed: Option<u64>,
}

impl Default for SimulationSettings {
    fn default() -> Self {
        Self {
            tick_interval_ms: 100,
            max_request_lifetime_ms: 30_000,
            max_history_length: 1_000,
            max_metric_history: 100,
            request_mix: RequestMix::default(),
            node_overload_failure_chance: 0.3,
            retry_chance: 0.05,
            base_request_size_kb: 10.0,
            max_node_impact: 0.1,
            edge_overload_threshold: 0.9,
            network_congestion_failure_chance: 0.2,
            edge_overload_penalty_ms: 20.0,
            max_requests_per_tick: 10_000,
            seed: None,
        }
    }
}

/// Request type probabilities. Transaction takes whatever the other three leave.
#[derive(Clone, Debug, Deserialize, Serialize)]
#[serde(default)]
pub struct RequestMix {
    pub read: f64,
    pub write: f64,
    pub compute: f64,
}

impl Default for RequestMix {
    fn default() -> Self {
        Self {
            read: 0.40,
            write: 0.30,
            compute: 0.15,
        }
    }
}

impl RequestMix {
    pub fn transaction(&self) -> f64 {
        (1.0 - self.read - self.write - self.compute).max(0.0)
    }
}

#[derive(Clone, Copy, Debug, Default, Deserialize, Serialize, PartialEq)]
pub struct Position {
    pub x: f64,
    pub y: f64,
}

#[derive(Clone, Debug, Deserialize, Serialize)]
pub struct Node {
    pub id: NodeId,
    #[serde(default)]
    pub position: Position,
    #[serde(flatten)]
    pub kind: NodeKind,
}

#[derive(Clone, Debug, Deserialize, Serialize)]
#[serde(tag = "type", rename_all = "kebab-case")]
pub enum NodeKind {
    Client(ClientConfig),
    Server(ServerConfig),
    Database(DatabaseConfig),
    LoadBalancer(LoadBalancerConfig),
    Cache(CacheConfig),
}

impl NodeKind {
    pub const LABELS: [&'static str; 5] = ["client", "server", "database", "load-balancer", "cache"];

    pub fn label(&self) -> &'static str {
        match self {
            NodeKind::Client(_) => "client",
            NodeKind::Server(_) => "server",
            NodeKind::Database(_) => "database",
            NodeKind::LoadBalancer(_) => "load-balancer",
            NodeKind::Cache(_) => "cache",
        }
    }
}

impl Node {
    pub fn new(id: impl Into<NodeId>, kind: NodeKind) -> Self {
        Self {
            id: id.into(),
            position: Position::default(),
            kind,
        }
    }

    pub fn is_client(&self) -> bool {
        matches!(self.kind, NodeKind::Client(_))
    }

    pub fn is_server(&self) -> bool {
        matches!(self.kind, NodeKind::Server(_))
    }

    pub fn is_database(&self) -> bool {
        matches!(self.kind, NodeKind::Database(_))
    }

    pub fn is_load_balancer(&self) -> bool {
        matches!(self.kind, NodeKind::LoadBalancer(_))
    }

    pub fn is_cache(&self) -> bool {
        matches!(self.kind, NodeKind::Cache(_))
    }

    pub fn as_client(&self) -> Option<&ClientConfig> {
        match &self.kind {
            NodeKind::Client(config) => Some(config),
            _ => None,
        }
    }

    pub fn as_server(&self) -> Option<&ServerConfig> {
        match &self.kind {
            NodeKind::Server(config) => Some(config),
            _ => None,
        }
    }

    pub fn as_database(&self) -> Option<&DatabaseConfig> {
        match &self.kind {
            NodeKind::Database(config) => Some(config),
            _ => None,
        }
    }

    pub fn as_load_balancer(&self) -> Option<&LoadBalancerConfig> {
        match &self.kind {
            NodeKind::LoadBalancer(config) => Some(config),
            _ => None,
        }
    }

    pub fn as_cache(&self) -> Option<&CacheConfig> {
        match &self.kind {
            NodeKind::Cache(config) => Some(config),
            _ => None,
        }
    }
}

#[derive(Clone, Copy, Debug, Default, Deserialize, Serialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "kebab-case")]
pub enum Protocol {
    #[default]
    Http,
    Https,
    Grpc,
    #[serde(rename = "websocket")]
    WebSocket,
    Tcp,
}

#[derive(Clone, Copy, Debug, Default, Deserialize, Serialize, PartialEq, Eq)]
#[serde(rename_all = "kebab-case")]
pub enum RequestPattern {
    #[default]
    Steady,
    Bursty,
    Periodic,
    Random,
}

#[derive(Clone, Copy, Debug, Default, Deserialize, Serialize, PartialEq, Eq)]
#[serde(rename_all = "kebab-case")]
pub enum RetryPolicy {
    None,
    #[default]
    Fixed,
    Exponential,
}

#[derive(Clone, Copy, Debug, Default, Deserialize, Serialize, PartialEq, Eq)]
#[serde(rename_all = "kebab-case")]
pub enum PerformanceTier {
    Low,
    #[default]
    Medium,
    High,
}

#[derive(Clone, Copy, Debug, Default, Deserialize, Serialize, PartialEq, Eq)]
#[serde(rename_all = "kebab-case")]
pub enum DeviceClass {
    #[default]
    Desktop,
    Mobile,
    Iot,
}

#[derive(Clone, Copy, Debug, Default, Deserialize, Serialize, PartialEq, Eq)]
#[serde(rename_all = "kebab-case")]
pub enum AuthMethod {
    #[default]
    None,
    ApiKey,
    Jwt,
    #[serde(rename = "oauth")]
    OAuth,
    Mtls,
}

#[derive(Clone, Debug, Deserialize, Serialize)]
#[serde(default)]
pub struct ClientConfig {
    pub concurrent_users: u32,
    pub think_time_ms: f64,
    pub request_pattern: RequestPattern,
    pub burst_multiplier: f64,
    pub burst_period_ms: u64,
    pub burst_duration_ms: u64,
    pub periodic_period_ms: u64,
    pub periodic_amplitude: f64,
    pub preferred_protocol: Protocol,
    pub retry_policy: RetryPolicy,
    pub max_retries: u32,
    pub retry_on_error: bool,
    pub cache_enabled: bool,
    pub region: String,
    pub device_performance: PerformanceTier,
    pub device_class: DeviceClass,
    pub bandwidth_limit_mbps: Option<f64>,
    pub authentication: AuthMethod,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            concurrent_users: 10,
            think_time_ms: 1_000.0,
            request_pattern: RequestPattern::Steady,
            burst_multiplier: 3.0,
            burst_period_ms: 5_000,
            burst_duration_ms: 1_000,
            periodic_period_ms: 10_000,
            periodic_amplitude: 0.5,
            preferred_protocol: Protocol::Http,
            retry_policy: RetryPolicy::Fixed,
            max_retries: 3,
            retry_on_error: true,
            cache_enabled: true,
            region: "us-east".to_string(),
            device_performance: PerformanceTier::Medium,
            device_class: DeviceClass::Desktop,
            bandwidth_limit_mbps: None,
            authentication: AuthMethod::None,
        }
    }
}

#[derive(Clone, Copy, Debug, Default, Deserialize, Serialize, PartialEq, Eq)]
#[serde(rename_all = "kebab-case")]
pub enum ServerType {
    Web,
    #[default]
    Application,
    Api,
    Compute,
}

#[derive(Clone, Debug, Deserialize, Serialize)]
#[serde(default)]
pub struct ServerConfig {
    pub server_type: ServerType,
    pub cpu_cores: u32,
    pub memory_gb: f64,
    pub max_concurrent_requests: u32,
    pub average_processing_time_ms: f64,
    pub supported_protocols: Vec<Protocol>,
    pub auto_scaling: bool,
    pub authentication: AuthMethod,
    pub failure_probability: f64,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            server_type: ServerType::Application,
            cpu_cores: 4,
            memory_gb: 8.0,
            max_concurrent_requests: 100,
            average_processing_time_ms: 50.0,
            supported_protocols: vec![Protocol::Http, Protocol::Https],
            auto_scaling: false,
            authentication: AuthMethod::None,
            failure_probability: 0.001,
        }
    }
}

impl ServerConfig {
    pub fn supports(&self, protocol: Protocol) -> bool {
        self.supported_protocols.contains(&protocol)
    }
}

#[derive(Clone, Copy, Debug, Default, Deserialize, Serialize, PartialEq, Eq)]
#[serde(rename_all = "kebab-case")]
pub enum DatabaseType {
    #[default]
    Relational,
    Document,
    KeyValue,
    Graph,
    TimeSeries,
}

#[derive(Clone, Copy, Debug, Default, Deserialize, Serialize, PartialEq, Eq)]
#[serde(rename_all = "kebab-case")]
pub enum IsolationLevel {
    ReadUncommitted,
    #[default]
    ReadCommitted,
    RepeatableRead,
    Serializable,
}

#[derive(Clone, Copy, Debug, Default, Deserialize, Serialize, PartialEq, Eq)]
#[serde(rename_all = "kebab-case")]
pub enum QueryComplexity {
    #[default]
    Simple,
    Moderate,
    Complex,
}

#[derive(Clone, Debug, Deserialize, Serialize)]
#[serde(default)]
pub struct DatabaseConfig {
    pub database_type: DatabaseType,
    pub max_connections: u32,
    pub average_latency_ms: f64,
    pub read_replicas: u32,
    pub isolation_level: IsolationLevel,
    pub query_complexity: QueryComplexity,
    pub replication: bool,
    pub sharding: bool,
    pub failure_probability: f64,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            database_type: DatabaseType::Relational,
            max_connections: 100,
            average_latency_ms: 20.0,
            read_replicas: 0,
            isolation_level: IsolationLevel::ReadCommitted,
            query_complexity: QueryComplexity::Simple,
            replication: false,
            sharding: false,
            failure_probability: 0.0005,
        }
    }
}

#[derive(Clone, Copy, Debug, Default, Deserialize, Serialize, PartialEq, Eq)]
#[serde(rename_all = "kebab-case")]
pub enum LoadBalancerType {
    Network,
    #[default]
    Application,
    Gateway,
    Classic,
}

#[derive(Clone, Copy, Debug, Default, Deserialize, Serialize, PartialEq, Eq)]
#[serde(rename_all = "kebab-case")]
pub enum BalancingAlgorithm {
    #[default]
    RoundRobin,
    LeastConnections,
    IpHash,
    Weighted,
}

#[derive(Clone, Debug, Deserialize, Serialize)]
#[serde(default)]
pub struct LoadBalancerConfig {
    pub lb_type: LoadBalancerType,
    pub algorithm: BalancingAlgorithm,
    pub max_connections: u32,
    pub processing_latency_ms: Option<f64>,
    pub session_persistence: bool,
    pub content_based_routing: bool,
    pub ssl_termination: bool,
    pub health_checks: bool,
    pub auto_scaling: bool,
    pub failure_probability: f64,
}

impl Default for LoadBalancerConfig {
    fn default() -> Self {
        Self {
            lb_type: LoadBalancerType::Application,
            algorithm: BalancingAlgorithm::RoundRobin,
            max_connections: 1_000,
            processing_latency_ms: None,
            session_persistence: false,
            content_based_routing: false,
            ssl_termination: false,
            health_checks: true,
            auto_scaling: false,
            failure_probability: 0.0002,
        }
    }
}

#[derive(Clone, Copy, Debug, Default, Deserialize, Serialize, PartialEq, Eq)]
#[serde(rename_all = "kebab-case")]
pub enum CacheType {
    #[default]
    InMemory,
    Distributed,
    Cdn,
}

#[derive(Clone, Copy, Debug, Default, Deserialize, Serialize, PartialEq, Eq)]
#[serde(rename_all = "kebab-case")]
pub enum EvictionPolicy {
    #[default]
    Lru,
    Lfu,
    Fifo,
    Ttl,
}

#[derive(Clone, Copy, Debug, Default, Deserialize, Serialize, PartialEq, Eq)]
#[serde(rename_all = "kebab-case")]
pub enum WritePolicy {
    #[default]
    WriteThrough,
    WriteBehind,
    WriteAround,
}

#[derive(Clone, Debug, Deserialize, Serialize)]
#[serde(default)]
pub struct CacheConfig {
    pub cache_type: CacheType,
    pub capacity_mb: f64,
    pub max_connections: u32,
    pub average_latency_ms: f64,
    pub expected_hit_rate: f64,
    pub eviction_policy: EvictionPolicy,
    pub write_policy: WritePolicy,
    pub replication: bool,
    pub failure_probability: f64,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            cache_type: CacheType::InMemory,
            capacity_mb: 1_024.0,
            max_connections: 500,
            average_latency_ms: 2.0,
            expected_hit_rate: 0.8,
            eviction_policy: EvictionPolicy::Lru,
            write_policy: WritePolicy::WriteThrough,
            replication: false,
            failure_probability: 0.001,
        }
    }
}

#[derive(Clone, Debug, Deserialize, Serialize)]
pub struct Edge {
    pub id: EdgeId,
    pub source: NodeId,
    pub target: NodeId,
    #[serde(default)]
    pub link: LinkConfig,
    #[serde(flatten)]
    pub kind: EdgeKind,
}

impl Edge {
    pub fn new(
        id: impl Into<EdgeId>,
        source: impl Into<NodeId>,
        target: impl Into<NodeId>,
        kind: EdgeKind,
    ) -> Self {
        Self {
            id: id.into(),
            source: source.into(),
            target: target.into(),
            link: LinkConfig::default(),
            kind,
        }
    }
}

/// Attributes every link carries regardless of protocol.
#[derive(Clone, Debug, Deserialize, Serialize)]
#[serde(default)]
pub struct LinkConfig {
    pub bandwidth_mbps: f64,
    pub throughput_rps: Option<f64>,
    pub latency_ms: f64,
    pub reliability: f64,
    pub encrypted: bool,
    pub failure_probability: Option<f64>,
}

impl Default for LinkConfig {
    fn default() -> Self {
        Self {
            bandwidth_mbps: 100.0,
            throughput_rps: None,
            latency_ms: 1.0,
            reliability: 0.999,
            encrypted: false,
            failure_probability: None,
        }
    }
}

#[derive(Clone, Debug, Deserialize, Serialize)]
#[serde(tag = "type", rename_all = "kebab-case")]
pub enum EdgeKind {
    Http {
        #[serde(default = "default_true")]
        keep_alive: bool,
        #[serde(default)]
        compression: bool,
    },
    #[serde(rename = "websocket")]
    WebSocket {
        #[serde(default)]
        compression: bool,
    },
    Grpc {
        #[serde(default)]
        streaming: bool,
        #[serde(default = "default_true")]
        compression: bool,
    },
    Tcp {
        #[serde(default)]
        nagle: bool,
        #[serde(default = "default_true")]
        keep_alive: bool,
    },
    Udp,
    Kafka(QueueConfig),
    #[serde(rename = "rabbitmq")]
    RabbitMq(QueueConfig),
    Sqs(QueueConfig),
    Database {
        #[serde(default = "default_pool_size")]
        connection_pool_size: u32,
    },
    EventStream {
        #[serde(default = "default_partitions")]
        partitions: u32,
    },
}

impl EdgeKind {
    pub fn http() -> Self {
        EdgeKind::Http {
            keep_alive: true,
            compression: false,
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            EdgeKind::Http { .. } => "http",
            EdgeKind::WebSocket { .. } => "websocket",
            EdgeKind::Grpc { .. } => "grpc",
            EdgeKind::Tcp { .. } => "tcp",
            EdgeKind::Udp => "udp",
            EdgeKind::Kafka(_) => "kafka",
            EdgeKind::RabbitMq(_) => "rabbitmq",
            EdgeKind::Sqs(_) => "sqs",
            EdgeKind::Database { .. } => "database",
            EdgeKind::EventStream { .. } => "event-stream",
        }
    }
}

#[derive(Clone, Debug, Deserialize, Serialize)]
#[serde(default)]
pub struct QueueConfig {
    pub persistent: bool,
    pub batch_size: u32,
    pub ordered: bool,
}

impl Default for QueueConfig {
    fn default() -> Self {
        Self {
            persistent: true,
            batch_size: 1,
            ordered: false,
        }
    }
}

fn default_true() -> bool {
    true
}

fn default_pool_size() -> u32 {
    10
}

fn default_partitions() -> u32 {
    1
}

impl fmt::Display for Protocol {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Protocol::Http => "http",
            Protocol::Https => "https",
            Protocol::Grpc => "grpc",
            Protocol::WebSocket => "websocket",
            Protocol::Tcp => "tcp",
        };
        write!(f, "{}", label)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn scenario_parses_from_toml_with_defaults() {
        let source = r#"
[simulation]
tick_interval_ms = 50
seed = 7

[[nodes]]
id = "web"
type = "client"
concurrent_users = 20

[[nodes]]
id = "api"
type = "server"
cpu_cores = 16

[[nodes]]
id = "lb"
type = "load-balancer"
lb_type = "network"

[[edges]]
id = "e1"
source = "web"
target = "api"
type = "http"

[[edges]]
id = "e2"
source = "api"
target = "lb"
type = "kafka"
batch_size = 10
"#;
        let scenario: Scenario = toml::from_str(source).expect("scenario should parse");
        assert_eq!(scenario.simulation.tick_interval_ms, 50);
        assert_eq!(scenario.simulation.seed, Some(7));
        assert_eq!(scenario.simulation.max_request_lifetime_ms, 30_000);

        let client = scenario.nodes[0].as_client().expect("client node");
        assert_eq!(client.concurrent_users, 20);
        assert_eq!(client.think_time_ms, 1_000.0);

        let server = scenario.nodes[1].as_server().expect("server node");
        assert_eq!(server.cpu_cores, 16);
        assert_eq!(server.max_concurrent_requests, 100);

        let lb = scenario.nodes[2].as_load_balancer().expect("lb node");
        assert_eq!(lb.lb_type, LoadBalancerType::Network);

        assert!(matches!(
            scenario.edges[0].kind,
            EdgeKind::Http {
                keep_alive: true,
                compression: false
            }
        ));
        match &scenario.edges[1].kind {
            EdgeKind::Kafka(queue) => assert_eq!(queue.batch_size, 10),
            other => panic!("unexpected edge kind {:?}", other),
        }
        assert_eq!(scenario.edges[1].link.bandwidth_mbps, 100.0);
    }

    #[test]
    fn scenario_parses_from_json() {
        let source = r#"{
            "nodes": [
                {"id": "c", "type": "client", "preferred_protocol": "grpc"},
                {"id": "kv", "type": "cache", "write_policy": "write-behind"}
            ],
            "edges": [
                {"id": "e", "source": "c", "target": "kv", "type": "grpc",
                 "link": {"bandwidth_mbps": 10.0, "failure_probability": 0.5}}
            ]
        }"#;
        let scenario: Scenario = serde_json::from_str(source).expect("scenario should parse");
        let client = scenario.nodes[0].as_client().expect("client node");
        assert_eq!(client.preferred_protocol, Protocol::Grpc);
        let cache = scenario.nodes[1].as_cache().expect("cache node");
        assert_eq!(cache.write_policy, WritePolicy::WriteBehind);
        assert_eq!(scenario.edges[0].link.failure_probability, Some(0.5));
        assert_eq!(scenario.edges[0].kind.label(), "grpc");
    }

    #[test]
    fn request_mix_leaves_remainder_to_transactions() {
        let mix = RequestMix::default();
        assert!((mix.transaction() - 0.15).abs() < 1e-9);
    }

    #[test]
    fn typed_accessors_only_match_their_variant() {
        let node = Node::new("db", NodeKind::Database(DatabaseConfig::default()));
        assert!(node.is_database());
        assert!(node.as_database().is_some());
        assert!(node.as_server().is_none());
        assert_eq!(node.kind.label(), "database");
    }
}
