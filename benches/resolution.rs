//! Performance benchmarks for chapter resolution and emotion classification.
//!
//! Run with: `cargo bench --bench resolution`
//!
//! ## Performance Targets
//!
//! | Operation | Target | Notes |
//! |-----------|--------|-------|
//! | Resolve 1k nodes | <5ms | Typical book |
//! | Resolve 10k nodes | <100ms | Largest expected export |
//! | Classify | <1µs | Per line, palette scan |

use std::collections::BTreeMap;

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};

use storybook_kernel::{order_chapters, resolve, EmotionClassifier, FlowGraph, Node, NodeId, NodeRole, Rgba};

/// Book with `chapters` chapters, each holding dialogues of four lines.
///
/// Every fourth dialogue nests under the previous one to lengthen parent chains.
fn make_book(chapters: usize, dialogues_per_chapter: usize) -> FlowGraph {
    let mut graph = FlowGraph::new();
    for c in 0..chapters {
        let chapter = format!("c{:03}", c);
        graph.add_node(Node::new(chapter.clone(), NodeRole::Chapter));
        for d in 0..dialogues_per_chapter {
            let dialogue = format!("{}_d{:04}", chapter, d);
            let parent = if d % 4 == 3 {
                format!("{}_d{:04}", chapter, d - 1)
            } else {
                chapter.clone()
            };
            graph.add_node(Node::new(dialogue.clone(), NodeRole::Dialogue).with_parent(parent));
            for l in 0..4 {
                graph.add_node(Node::new(format!("{}_l{}", dialogue, l), NodeRole::DialogueLine).with_parent(dialogue.clone()));
            }
        }
    }
    graph
}

fn bench_resolve(c: &mut Criterion) {
    let mut group = c.benchmark_group("resolve");

    for (chapters, dialogues) in [(5, 40), (10, 200), (20, 400)] {
        let graph = make_book(chapters, dialogues);
        let numbers: BTreeMap<NodeId, u32> = (0..chapters)
            .map(|i| (NodeId::new(format!("c{:03}", i)), i as u32 + 1))
            .collect();
        let ordered = order_chapters(&numbers, None).unwrap();

        group.throughput(Throughput::Elements(graph.num_nodes() as u64));
        group.bench_with_input(BenchmarkId::from_parameter(graph.num_nodes()), &graph, |b, graph| {
            b.iter(|| resolve(black_box(graph), black_box(&ordered)))
        });
    }

    group.finish();
}

fn bench_classify(c: &mut Criterion) {
    let classifier = EmotionClassifier::default();
    let colors: Vec<Rgba> = (0..256u32)
        .map(|i| Rgba::from_u8((i * 7 % 256) as u8, (i * 13 % 256) as u8, (i * 31 % 256) as u8))
        .collect();

    let mut group = c.benchmark_group("classify");
    group.throughput(Throughput::Elements(colors.len() as u64));
    group.bench_function("palette_256", |b| {
        b.iter(|| {
            for color in &colors {
                black_box(classifier.classify(Some(black_box(color))));
            }
        })
    });
    group.finish();
}

criterion_group!(benches, bench_resolve, bench_classify);
criterion_main!(benches);
