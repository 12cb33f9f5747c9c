// Diagram and report generation from an extracted provenance path

use crate::builder::Unexplained;
use crate::extract::{PathEdge, PathVertex, ProvenancePath};
use petgraph::dot::Dot;
use petgraph::graph::{DiGraph, NodeIndex};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fs::File;
use std::io::Write;
use std::path::Path;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum DiagramFormat {
    DrawIo,
    Dot,
    Json,
    Text,
}

impl DiagramFormat {
    pub fn from_str(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "drawio" | "xml" => Some(DiagramFormat::DrawIo),
            "dot" => Some(DiagramFormat::Dot),
            "json" => Some(DiagramFormat::Json),
            "text" | "txt" => Some(DiagramFormat::Text),
            _ => None,
        }
    }
}

/// Quadrant signs; a vertex lands in quadrant `index % 4`
const QUADRANTS: [(f64, f64); 4] = [(1.0, 1.0), (1.0, -1.0), (-1.0, 1.0), (-1.0, -1.0)];

pub fn render_diagram(
    path: &ProvenancePath,
    unexplained: &[Unexplained],
    format: &DiagramFormat,
) -> Result<String, serde_json::Error> {
    match format {
        DiagramFormat::DrawIo => Ok(generate_drawio_diagram(path)),
        DiagramFormat::Dot => Ok(generate_dot_diagram(path)),
        DiagramFormat::Json => generate_json_report(path, unexplained),
        DiagramFormat::Text => Ok(generate_text_report(path, unexplained)),
    }
}

/// Side of the square cell that fits `text` once broken into lines
fn cell_size(text: &str) -> u32 {
    let len = text.trim().chars().count() as f64;
    let c = len.sqrt().max(4.0);
    ((len / (c + c / 2.0) + 1.0) * 16.0).floor() as u32
}

/// Break `text` into roughly square lines and escape it for an XML attribute
fn break_text(text: &str) -> String {
    let chars: Vec<char> = text.trim().chars().collect();
    let c = (chars.len() as f64).sqrt().max(4.0) * 1.5;

    let mut lines = String::new();
    let mut i = 1usize;
    let mut start = 0usize;
    while start < chars.len() {
        let end = ((i as f64 * c).round() as usize).min(chars.len());
        lines.extend(&chars[start..end]);
        lines.push('\n');
        i += 1;
        start = ((i - 1) as f64 * c).round() as usize;
    }

    escape_xml(lines.trim_end())
}

fn escape_xml(text: &str) -> String {
    let mut escaped = String::with_capacity(text.len());
    for ch in text.chars() {
        match ch {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&quot;"),
            '\'' => escaped.push_str("&apos;"),
            '\n' => escaped.push_str("&#xa;"),
            other => escaped.push(other),
        }
    }
    escaped
}

fn drawio_vertex(vertex: &PathVertex) -> String {
    let size = cell_size(&vertex.url);
    let (a, b) = QUADRANTS[vertex.index % QUADRANTS.len()];
    let offset = (size as usize + vertex.index * 4) as f64;

    format!(
        r#"<mxCell id="url-{index}" parent="1" style="rounded=1;aspect=fixed" value="{value}" vertex="1">
      <mxGeometry height="{size}" width="{size}" x="{x}" y="{y}" as="geometry" />
    </mxCell>
"#,
        index = vertex.index,
        value = break_text(&vertex.url),
        size = size,
        x = offset * a,
        y = offset * b,
    )
}

fn drawio_edge(edge: &PathEdge) -> String {
    let mut cells = format!(
        r#"<mxCell id="arrow-{s}-{t}" edge="1" parent="1" source="url-{s}" target="url-{t}">
      <mxGeometry as="geometry" />
    </mxCell>
"#,
        s = edge.source,
        t = edge.target,
    );

    if !edge.label.is_empty() {
        cells.push_str(&format!(
            r#"<mxCell id="label-{s}-{t}" parent="arrow-{s}-{t}" style="edgeLabel;html=1;align=center;verticalAlign=middle;resizable=0" value="{value}" vertex="1">
      <mxGeometry relative="1" as="geometry" />
    </mxCell>
"#,
            s = edge.source,
            t = edge.target,
            value = break_text(&edge.label),
        ));
    }

    cells
}

/// draw.io / diagrams.net `mxGraphModel` document
pub fn generate_drawio_diagram(path: &ProvenancePath) -> String {
    let mut doc = String::new();
    doc.push_str("<mxGraphModel>\n  <root>\n");
    doc.push_str("    <mxCell id=\"0\" />\n");
    doc.push_str("    <mxCell id=\"1\" parent=\"0\" />\n");

    for vertex in &path.vertices {
        doc.push_str("    ");
        doc.push_str(&drawio_vertex(vertex));
    }
    for edge in &path.edges {
        doc.push_str("    ");
        doc.push_str(&drawio_edge(edge));
    }

    doc.push_str("  </root>\n</mxGraphModel>\n");
    doc
}

/// Copy of the path as a petgraph graph, nodes labelled `#index url`
fn to_petgraph(path: &ProvenancePath) -> DiGraph<String, String> {
    let mut graph = DiGraph::new();
    let mut nodes: HashMap<usize, NodeIndex> = HashMap::new();

    for vertex in &path.vertices {
        let node = graph.add_node(format!("#{} {}", vertex.index, vertex.url));
        nodes.insert(vertex.index, node);
    }
    for edge in &path.edges {
        if let (Some(&source), Some(&target)) = (nodes.get(&edge.source), nodes.get(&edge.target)) {
            graph.add_edge(source, target, edge.label.clone());
        }
    }

    graph
}

/// Graphviz DOT document
pub fn generate_dot_diagram(path: &ProvenancePath) -> String {
    let graph = to_petgraph(path);
    format!("{}", Dot::new(&graph))
}

pub fn generate_json_report(
    path: &ProvenancePath,
    unexplained: &[Unexplained],
) -> Result<String, serde_json::Error> {
    let json_report = serde_json::json!({
        "metadata": {
            "generator": "streamtrace",
            "version": env!("CARGO_PKG_VERSION"),
            "format": "json"
        },
        "summary": {
            "root": path.root,
            "target": path.target,
            "connected": path.is_connected(),
            "vertices": path.vertices.len(),
            "edges": path.edges.len()
        },
        "vertices": path.vertices,
        "edges": path.edges,
        "unexplained": unexplained
    });

    serde_json::to_string_pretty(&json_report)
}

pub fn generate_text_report(path: &ProvenancePath, unexplained: &[Unexplained]) -> String {
    let mut report = String::new();
    report.push_str("━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━\n\n");
    report.push_str("# Summary:\n");
    if let Some(target) = path.vertex(path.target) {
        report.push_str(&format!("  Target: {}\n", target.url));
    }
    report.push_str(&format!("  Exchanges on path: {}\n", path.vertices.len()));
    report.push_str(&format!("  Dependencies: {}\n", path.edges.len()));
    report.push_str(&format!(
        "  Connected to root: {}\n",
        if path.is_connected() { "yes" } else { "no" }
    ));
    report.push_str("\n━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━\n\n");

    report.push_str("## Exchanges\n");
    for vertex in &path.vertices {
        let marker = if vertex.rooted { ' ' } else { '~' };
        report.push_str(&format!("  {}[{}] {}\n", marker, vertex.index, vertex.url));
    }

    report.push_str("\n## Dependencies\n");
    for edge in &path.edges {
        let evidence = if edge.direct {
            "(direct URL reference)".to_string()
        } else {
            edge.label.clone()
        };
        report.push_str(&format!(
            "  [{}] -> [{}]  {}\n",
            edge.source, edge.target, evidence
        ));
    }

    if !unexplained.is_empty() {
        report.push_str("\n## Unexplained\n");
        for residue in unexplained {
            report.push_str(&format!("  [{}] {}\n", residue.index, residue.url));
            report.push_str(&format!(
                "      {}\n",
                residue
                    .missing
                    .iter()
                    .map(String::as_str)
                    .collect::<Vec<_>>()
                    .join(", ")
            ));
        }
    }

    report
}

pub fn save_diagram(content: &str, path: &Path) -> std::io::Result<()> {
    let mut file = File::create(path)?;
    file.write_all(content.as_bytes())?;
    Ok(())
}
