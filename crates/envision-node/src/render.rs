//! Text renderings of results: Graphviz DOT and a plain state table.

use envision_core::{Relationship, RuleScope};
use envision_graph::StateGraph;
use envision_scenario::Scenario;

/// Graphviz DOT for a state graph. One box per state, closure edges dashed,
/// the initial state bold and terminal states doubled.
pub fn state_graph_dot(graph: &StateGraph) -> String {
    let terminal = graph.terminal_nodes();
    let mut dot = String::from("digraph state_graph {\n    node [shape=box, fontsize=10];\n");

    for (id, state) in graph.nodes() {
        let mut attrs = format!("label=\"{}\"", escape(&state.readable_id().replace(" | ", "\n")));
        if graph.initial() == Some(id) {
            attrs.push_str(", style=bold");
        }
        if terminal.contains(&id) {
            attrs.push_str(", peripheries=2");
        }
        dot.push_str(&format!("    \"{}\" [{}];\n", id, attrs));
    }

    for edge in graph.edges() {
        let style = if edge.is_implied() { ", style=dashed" } else { "" };
        dot.push_str(&format!(
            "    \"{}\" -> \"{}\" [label=\"{}\"{}];\n",
            edge.source,
            edge.target,
            escape(&edge.label),
            style
        ));
    }

    dot.push_str("}\n");
    dot
}

/// Graphviz DOT for the causal model of a scenario: one cluster per entity,
/// one node per quantity, one edge per cross-quantity rule.
pub fn causal_model_dot(scenario: &Scenario) -> String {
    let mut dot = String::from("digraph causal_model {\n    node [shape=ellipse, fontsize=10];\n");

    for (index, entity) in scenario.initial.entities().iter().enumerate() {
        dot.push_str(&format!("    subgraph cluster_{} {{\n", index));
        dot.push_str(&format!(
            "        label=\"{} ({})\";\n",
            escape(entity.name()),
            escape(entity.role())
        ));
        for quantity in entity.quantities() {
            dot.push_str(&format!(
                "        \"{}.{}\" [label=\"{}\\nM: {}  d: {}\"];\n",
                entity.name(),
                quantity.name(),
                escape(quantity.name()),
                quantity.magnitude(),
                quantity.derivative()
            ));
        }
        dot.push_str("    }\n");
    }

    let rules = scenario.rules.inter.iter().chain(scenario.rules.intra.iter());
    for rule in rules.filter(|r| !is_reflexive(r)) {
        let style = match rule.scope() {
            RuleScope::Intra => ", style=dotted",
            RuleScope::Inter => "",
        };
        let arrow = match rule {
            Relationship::ValueCorrespondence { bidirectional: true, .. } => ", dir=both",
            _ => "",
        };
        dot.push_str(&format!(
            "    \"{}\" -> \"{}\" [label=\"{}\"{}{}];\n",
            rule.source(),
            rule.target(),
            rule.kind(),
            style,
            arrow
        ));
    }

    dot.push_str("}\n");
    dot
}

/// Plain-text table with one row per state and one column per quantity.
pub fn state_table(graph: &StateGraph) -> String {
    let Some((_, first)) = graph.nodes().next() else {
        return String::new();
    };

    let mut header = vec!["id".to_string()];
    header.extend(first.quantities().map(|(entity, q)| format!("{}.{}", entity, q.name())));

    let rows: Vec<Vec<String>> = graph
        .nodes()
        .map(|(id, state)| {
            let mut row = vec![id.to_string()];
            row.extend(
                state
                    .quantities()
                    .map(|(_, q)| format!("({}, {})", q.magnitude(), q.derivative())),
            );
            row
        })
        .collect();

    let widths: Vec<usize> = (0..header.len())
        .map(|col| {
            rows.iter()
                .map(|row| row[col].len())
                .chain(std::iter::once(header[col].len()))
                .max()
                .unwrap_or(0)
        })
        .collect();

    let mut table = String::new();
    write_row(&mut table, &header, &widths);
    let rule: Vec<String> = widths.iter().map(|w| "-".repeat(*w)).collect();
    write_row(&mut table, &rule, &widths);
    for row in &rows {
        write_row(&mut table, row, &widths);
    }
    table
}

fn write_row(out: &mut String, cells: &[String], widths: &[usize]) {
    let line = cells
        .iter()
        .zip(widths)
        .map(|(cell, width)| format!("{:<width$}", cell, width = *width))
        .collect::<Vec<_>>()
        .join(" | ");
    out.push_str(line.trim_end());
    out.push('\n');
}

fn is_reflexive(rule: &Relationship) -> bool {
    matches!(
        rule,
        Relationship::Consequence { .. } | Relationship::Action { .. }
    )
}

fn escape(text: &str) -> String {
    text.replace('\\', "\\\\").replace('"', "\\\"").replace('\n', "\\n")
}
