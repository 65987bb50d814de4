// Integration tests for introspection + classification over in-memory schemas
use relgraph::{
    query_planner::{PlanKind, PlannerOptions, QueryPlanner},
    source_catalog::{classify, EdgeTableSpec, SchemaCatalog},
    source_db::{InMemorySource, InMemoryTable, SqlDialect},
};
use test_case::test_case;

fn table(name: &str, pk: &[&str], fks: &[&str]) -> InMemoryTable {
    let mut columns: Vec<&str> = pk.to_vec();
    for fk in fks {
        if !columns.contains(fk) {
            columns.push(fk);
        }
    }
    columns.push("note");

    let mut t = InMemoryTable::new(Some("shop"), name);
    for c in &columns {
        t = t.column(*c, "integer");
    }
    let mut t = t.primary_key(pk);
    for fk in fks {
        t = t.foreign_key(*fk, "target", "id");
    }
    t
}

#[test_case(&["a", "b"], &["a", "b"], true; "two keys two references")]
#[test_case(&["id"], &["a", "b"], false; "surrogate key two references")]
#[test_case(&["a", "b"], &["a"], false; "composite key one reference")]
#[test_case(&["a", "b"], &["a", "b", "c"], false; "three references")]
#[test_case(&[], &["a", "b"], false; "no key")]
#[tokio::test]
async fn test_junction_rule(pk: &[&str], fks: &[&str], junction: bool) {
    let source = InMemorySource::new()
        .with_table(table("target", &["id"], &[]))
        .with_table(table("subject", pk, fks));

    let tables = SchemaCatalog::introspect(&source).await.unwrap();
    let (vertices, edges) = classify(&tables);

    let junctions = edges
        .iter()
        .filter(|e| matches!(e, EdgeTableSpec::Junction(_)))
        .count();
    if junction {
        assert_eq!(vertices.len(), 1);
        assert_eq!(junctions, 1);
        assert_eq!(edges.len(), 1);
    } else {
        assert_eq!(vertices.len(), 2);
        assert_eq!(junctions, 0);
        // one direct spec per foreign key
        assert_eq!(edges.len(), fks.len());
    }
}

#[tokio::test]
async fn test_schema_qualified_labels_and_queries() {
    let source = InMemorySource::new()
        .with_table(table("target", &["id"], &[]))
        .with_table(table("orders", &["id"], &["customer"]));

    let tables = SchemaCatalog::introspect(&source).await.unwrap();
    assert_eq!(tables[1].table_name, "shop.orders");

    let (vertices, edges) = classify(&tables);
    match &edges[0] {
        EdgeTableSpec::Direct(direct) => {
            assert_eq!(direct.start_table, "shop.orders");
            assert_eq!(direct.end_table, "shop.target");
            assert_eq!(direct.foreign_key_column, "customer");
        }
        other => panic!("expected a direct edge spec, got {:?}", other),
    }

    let planner = QueryPlanner::new(SqlDialect::MySQL, PlannerOptions::default());
    let plans = planner.plan_all(&vertices, &edges);
    assert!(plans.iter().all(|p| p.kind == PlanKind::Vertex));
    assert_eq!(
        plans[1].statements(),
        vec!["SELECT `id`, `customer`, `note` FROM `shop`.`orders`"]
    );
}
