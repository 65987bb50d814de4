// Integration tests for the conversion pipeline over small hand-built schemas
use relgraph::{
    graph_builder::{
        ConversionReport, Graph, PropertyValue, RdbmsGraphConverter, SequentialIdGenerator,
        PRIMARY_KEY_IDENTIFIER,
    },
    query_planner::PlannerOptions,
    source_db::{InMemorySource, InMemoryTable, RawValue},
};
use std::collections::HashSet;
use std::sync::Arc;

fn int(i: i64) -> RawValue {
    RawValue::Int(i)
}

fn text(s: &str) -> RawValue {
    RawValue::Text(s.to_string())
}

async fn convert(source: InMemorySource) -> (Graph, ConversionReport) {
    convert_with(source, PlannerOptions::default()).await
}

async fn convert_with(source: InMemorySource, options: PlannerOptions) -> (Graph, ConversionReport) {
    RdbmsGraphConverter::new(
        Arc::new(source),
        Arc::new(SequentialIdGenerator::new()),
        options,
    )
    .convert()
    .await
    .expect("conversion failed")
}

fn table_a(ids: &[i64]) -> InMemoryTable {
    ids.iter().fold(
        InMemoryTable::new(None, "a")
            .column("id", "integer")
            .column("name", "varchar(20)")
            .primary_key(&["id"]),
        |t, id| t.row(vec![int(*id), text(&format!("a{}", id))]),
    )
}

fn table_b(rows: &[(i64, i64)]) -> InMemoryTable {
    rows.iter().fold(
        InMemoryTable::new(None, "b")
            .column("id", "integer")
            .column("a_id", "integer")
            .primary_key(&["id"])
            .foreign_key("a_id", "a", "id"),
        |t, (id, a_id)| t.row(vec![int(*id), int(*a_id)]),
    )
}

fn vertex_named<'g>(graph: &'g Graph, label: &str, name: &str) -> &'g relgraph::graph_builder::Vertex {
    graph
        .vertices_with_label(label)
        .find(|v| v.properties.get("name") == Some(&PropertyValue::from(name)))
        .expect("vertex not found")
}

#[tokio::test]
async fn test_round_trip_single_foreign_key() {
    let source = InMemorySource::new()
        .with_table(table_a(&[1, 2]))
        .with_table(table_b(&[(10, 1)]));

    let (graph, report) = convert(source).await;

    assert_eq!(graph.vertices.len(), 3);
    assert_eq!(graph.edges.len(), 1);

    let edge = &graph.edges[0];
    assert_eq!(edge.label, "b");
    let b10 = graph.vertices_with_label("b").next().unwrap();
    let a1 = vertex_named(&graph, "a", "a1");
    assert_eq!(edge.source, b10.id);
    assert_eq!(edge.target, a1.id);
    assert!(edge.properties.is_empty());
    assert_eq!(report.direct_edges, 1);
}

#[tokio::test]
async fn test_dangling_foreign_key_produces_nothing() {
    let source = InMemorySource::new()
        .with_table(table_a(&[1, 2]))
        .with_table(table_b(&[(10, 1), (11, 3)]));

    let (graph, report) = convert(source).await;

    assert_eq!(graph.vertices.len(), 4);
    assert_eq!(graph.edges.len(), 1);
    assert_eq!(report.dangling_references, 1);
}

#[tokio::test]
async fn test_null_foreign_key_is_not_dangling() {
    let source = InMemorySource::new()
        .with_table(table_a(&[1]))
        .with_table(
            InMemoryTable::new(None, "b")
                .column("id", "integer")
                .column("a_id", "integer")
                .primary_key(&["id"])
                .foreign_key("a_id", "a", "id")
                .row(vec![int(10), RawValue::Null]),
        );

    let (graph, report) = convert(source).await;
    assert!(graph.edges.is_empty());
    assert_eq!(report.dangling_references, 0);
}

#[tokio::test]
async fn test_junction_symmetry() {
    let source = InMemorySource::new()
        .with_table(table_a(&[1]))
        .with_table(
            InMemoryTable::new(None, "c")
                .column("id", "integer")
                .column("name", "text")
                .primary_key(&["id"])
                .row(vec![int(1), text("c1")]),
        )
        .with_table(
            InMemoryTable::new(None, "r")
                .column("a_id", "integer")
                .column("c_id", "integer")
                .primary_key(&["a_id", "c_id"])
                .foreign_key("a_id", "a", "id")
                .foreign_key("c_id", "c", "id")
                .row(vec![int(1), int(1)]),
        );

    let (graph, report) = convert(source).await;

    // the junction table itself yields no vertices
    assert_eq!(graph.vertices.len(), 2);
    assert_eq!(report.junction_tables, 1);

    let a1 = vertex_named(&graph, "a", "a1").id;
    let c1 = vertex_named(&graph, "c", "c1").id;
    let pairs: HashSet<_> = graph.edges.iter().map(|e| (e.source, e.target)).collect();
    assert_eq!(graph.edges.len(), 2);
    assert_eq!(pairs, HashSet::from([(a1, c1), (c1, a1)]));
    assert!(graph.edges.iter().all(|e| e.label == "r"));
}

#[tokio::test]
async fn test_junction_extra_attributes_on_both_directions() {
    let source = InMemorySource::new()
        .with_table(table_a(&[1, 2]))
        .with_table(
            InMemoryTable::new(None, "friends")
                .column("left_id", "integer")
                .column("right_id", "integer")
                .column("since", "date")
                .primary_key(&["left_id", "right_id"])
                .foreign_key("left_id", "a", "id")
                .foreign_key("right_id", "a", "id")
                .row(vec![int(1), int(2), text("2019-04-01")]),
        );

    let (graph, _) = convert(source).await;

    assert_eq!(graph.edges.len(), 2);
    for edge in &graph.edges {
        assert_eq!(edge.properties.len(), 1);
        assert_eq!(edge.properties["since"].canonical_key(), "2019-04-01");
    }
}

#[tokio::test]
async fn test_duplicate_natural_keys() {
    // No declared key constraint, so the "primary key" values may repeat
    let source = InMemorySource::new()
        .with_table(
            InMemoryTable::new(None, "a")
                .column("id", "integer")
                .column("name", "text")
                .primary_key(&["id"])
                .row(vec![int(1), text("first")])
                .row(vec![int(1), text("second")]),
        )
        .with_table(table_b(&[(10, 1)]));

    let (graph, _) = convert(source).await;

    assert_eq!(graph.edges.len(), 2);
    let targets: HashSet<_> = graph.edges.iter().map(|e| e.target).collect();
    assert_eq!(targets.len(), 2);
}

#[tokio::test]
async fn test_key_properties_are_removed() {
    let source = InMemorySource::new()
        .with_table(table_a(&[1, 2]))
        .with_table(table_b(&[(10, 1)]));

    let (graph, _) = convert(source).await;

    for vertex in &graph.vertices {
        assert!(!vertex.properties.contains_key(PRIMARY_KEY_IDENTIFIER));
        assert!(!vertex.properties.contains_key("id"));
        assert!(!vertex.properties.contains_key("a_id"));
    }
    assert_eq!(
        vertex_named(&graph, "a", "a2").properties.len(),
        1,
        "only the attribute column survives"
    );
}

#[tokio::test]
async fn test_conversion_is_deterministic() {
    let build = || {
        InMemorySource::new()
            .with_table(table_a(&[1, 2, 3]))
            .with_table(table_b(&[(10, 1), (11, 2), (12, 2)]))
    };

    let (first, _) = convert(build()).await;
    let (second, _) = convert(build()).await;
    assert_eq!(first, second);
}

#[tokio::test]
async fn test_partitioned_retrieval_keeps_every_row() {
    let rows: Vec<(i64, i64)> = (0..25).map(|i| (100 + i, 1 + i % 3)).collect();
    let source = InMemorySource::new()
        .with_table(table_a(&[1, 2, 3]))
        .with_table(table_b(&rows));

    let (graph, report) = convert_with(
        source,
        PlannerOptions {
            parallelism: 4,
            fetch_size: 5,
        },
    )
    .await;

    assert_eq!(graph.vertices_with_label("b").count(), 25);
    assert_eq!(report.direct_edges, 25);
}

#[tokio::test]
async fn test_self_reference_yields_self_loop_spec() {
    let source = InMemorySource::new().with_table(
        InMemoryTable::new(None, "employees")
            .column("id", "integer")
            .column("manager_id", "integer")
            .column("name", "text")
            .primary_key(&["id"])
            .foreign_key("manager_id", "employees", "id")
            .row(vec![int(1), RawValue::Null, text("boss")])
            .row(vec![int(2), int(1), text("worker")]),
    );

    let (graph, _) = convert(source).await;

    assert_eq!(graph.edges.len(), 1);
    let boss = vertex_named(&graph, "employees", "boss").id;
    let worker = vertex_named(&graph, "employees", "worker").id;
    assert_eq!((graph.edges[0].source, graph.edges[0].target), (worker, boss));
}

#[tokio::test]
async fn test_unsupported_columns_are_dropped() {
    let source = InMemorySource::new().with_table(
        InMemoryTable::new(None, "docs")
            .column("id", "integer")
            .column("body", "bytea")
            .column("tags", "text[]")
            .column("title", "text")
            .primary_key(&["id"])
            .row(vec![
                int(1),
                RawValue::Bytes(vec![0xde, 0xad]),
                RawValue::Text("{a,b}".to_string()),
                text("Hello"),
            ]),
    );

    let (graph, report) = convert(source).await;

    let doc = &graph.vertices[0];
    assert_eq!(doc.properties.keys().collect::<Vec<_>>(), vec!["title"]);
    assert_eq!(report.skipped_fields, 0);
}
