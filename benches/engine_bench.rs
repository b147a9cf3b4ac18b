use criterion::{black_box, criterion_group, criterion_main, BatchSize, BenchmarkId, Criterion};
use arch_sim::engine::SimulationEngine;
use arch_sim::graph::ArchitectureGraph;
use arch_sim::models::{
    CacheConfig, ClientConfig, DatabaseConfig, Edge, EdgeKind, LoadBalancerConfig, Node, NodeKind,
    ServerConfig, SimulationSettings,
};

const TICKS: u64 = 200;
const USERS: u32 = 100;

fn build_graph(servers: usize) -> ArchitectureGraph {
    let mut nodes = vec![
        Node::new(
            "client",
            NodeKind::Client(ClientConfig {
                concurrent_users: USERS,
                ..ClientConfig::default()
            }),
        ),
        Node::new("lb", NodeKind::LoadBalancer(LoadBalancerConfig::default())),
        Node::new("cache", NodeKind::Cache(CacheConfig::default())),
        Node::new("db", NodeKind::Database(DatabaseConfig::default())),
    ];
    let mut edges = vec![Edge::new("client-lb", "client", "lb", EdgeKind::http())];

    for idx in 0..servers {
        let name = format!("srv-{}", idx);
        edges.push(Edge::new(format!("lb-{}", name), "lb", name.as_str(), EdgeKind::http()));
        edges.push(Edge::new(
            format!("{}-cache", name),
            name.as_str(),
            "cache",
            EdgeKind::http(),
        ));
        edges.push(Edge::new(
            format!("{}-db", name),
            name.as_str(),
            "db",
            EdgeKind::Database {
                connection_pool_size: 10,
            },
        ));
        nodes.push(Node::new(name, NodeKind::Server(ServerConfig::default())));
    }

    ArchitectureGraph::new(nodes, edges)
}

fn bench_engine(c: &mut Criterion) {
    let mut group = c.benchmark_group("engine");

    for servers in [2usize, 4, 8] {
        let graph = build_graph(servers);
        let label = format!("{}ticks", TICKS);
        group.bench_with_input(
            BenchmarkId::new(format!("{}-servers", servers), &label),
            &graph,
            |b, graph: &ArchitectureGraph| {
                b.iter_batched(
                    || {
                        SimulationEngine::new(SimulationSettings {
                            seed: Some(1),
                            ..SimulationSettings::default()
                        })
                    },
                    |mut engine| {
                        engine.run_ticks(graph, TICKS).expect("run should succeed");
                        black_box(engine.report());
                    },
                    BatchSize::SmallInput,
                );
            },
        );
    }

    group.finish();
}

criterion_group!(benches, bench_engine);
criterion_main!(benches);
