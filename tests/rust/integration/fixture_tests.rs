// Integration tests for YAML fixtures and JSON output
use relgraph::{
    config::ConverterConfig,
    graph_builder::{PropertyValue, RdbmsGraphConverter},
    graph_output,
    source_db::InMemorySource,
};
use serde_json::Value;
use std::io::Write;
use std::sync::Arc;

const EMPLOYEES: &str = r#"
tables:
  - schema: hr
    name: departments
    columns:
      - { name: dept_no, type: "char(4)" }
      - { name: dept_name, type: "character varying(40)" }
    primary_key: [dept_no]
    rows:
      - [d001, Marketing]
      - [d002, Finance]
  - schema: hr
    name: employees
    columns:
      - { name: emp_no, type: integer }
      - { name: first_name, type: "character varying(14)" }
      - { name: birth_date, type: date }
      - { name: salary, type: "numeric(10,2)" }
    primary_key: [emp_no]
    rows:
      - [10001, Georgi, "1953-09-02", 60117.00]
      - [10002, Bezalel, "1964-06-02", 65828.50]
      - [10003, Parto, "1959-12-03", ~]
  - schema: hr
    name: dept_emp
    columns:
      - { name: emp_no, type: integer }
      - { name: dept_no, type: "char(4)" }
      - { name: from_date, type: date }
    primary_key: [emp_no, dept_no]
    foreign_keys:
      - { column: emp_no, references_table: employees, references_column: emp_no }
      - { column: dept_no, references_table: departments, references_column: dept_no }
    rows:
      - [10001, d001, "1986-06-26"]
      - [10002, d002, "1996-08-03"]
      - [10003, d001, "1995-12-03"]
      - [99999, d001, "2000-01-01"]
"#;

#[tokio::test]
async fn test_employee_fixture_end_to_end() {
    let source = InMemorySource::from_yaml_str(EMPLOYEES).unwrap();
    let (graph, report) = RdbmsGraphConverter::with_defaults(Arc::new(source))
        .convert()
        .await
        .unwrap();

    assert_eq!(report.tables_introspected, 3);
    assert_eq!(report.vertex_tables, 2);
    assert_eq!(report.junction_tables, 1);
    assert_eq!(graph.vertices.len(), 5);
    assert_eq!(report.junction_edges, 6);
    assert_eq!(report.dangling_references, 1);
    assert!(graph.edges.iter().all(|e| e.label == "hr.dept_emp"));

    let georgi = graph
        .vertices_with_label("hr.employees")
        .find(|v| v.properties.get("first_name") == Some(&PropertyValue::from("Georgi")))
        .unwrap();
    assert_eq!(georgi.properties["salary"].canonical_key(), "60117");
    assert_eq!(georgi.properties["birth_date"].canonical_key(), "1953-09-02");
    assert!(!georgi.properties.contains_key("emp_no"));

    let parto = graph
        .vertices_with_label("hr.employees")
        .find(|v| v.properties.get("first_name") == Some(&PropertyValue::from("Parto")))
        .unwrap();
    assert!(!parto.properties.contains_key("salary"));

    let marketing_edges = graph
        .edges
        .iter()
        .filter(|e| {
            graph
                .vertex(e.target)
                .map(|v| v.properties.get("dept_name") == Some(&PropertyValue::from("Marketing")))
                .unwrap_or(false)
        })
        .count();
    assert_eq!(marketing_edges, 2);
}

#[tokio::test]
async fn test_fixture_config_to_json_file() {
    let dir = tempfile::tempdir().unwrap();
    let fixture_path = dir.path().join("hr.yaml");
    let mut fixture = std::fs::File::create(&fixture_path).unwrap();
    fixture.write_all(EMPLOYEES.as_bytes()).unwrap();

    let output_path = dir.path().join("graph.json");
    let config = ConverterConfig {
        fixture: Some(fixture_path),
        output: Some(output_path.clone()),
        ..Default::default()
    };

    let converter = RdbmsGraphConverter::from_config(&config).await.unwrap();
    let (graph, _) = converter.convert().await.unwrap();
    graph_output::write_json_file(&graph, &output_path, config.pretty).unwrap();

    let json: Value = serde_json::from_str(&std::fs::read_to_string(&output_path).unwrap()).unwrap();
    assert_eq!(json["vertices"].as_array().unwrap().len(), 5);
    assert_eq!(json["edges"].as_array().unwrap().len(), 6);
    let edge = &json["edges"][0];
    assert_eq!(edge["properties"]["from_date"], "1986-06-26");
    assert!(edge["source"].is_string());
}

#[tokio::test]
async fn test_missing_fixture_file() {
    let config = ConverterConfig {
        fixture: Some("/nonexistent/relgraph/fixture.yaml".into()),
        ..Default::default()
    };
    assert!(RdbmsGraphConverter::from_config(&config).await.is_err());
}
