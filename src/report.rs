//! Human-readable analysis of a digraph: its edges, one depth-first search,
//! acyclicity and both strongly connected component algorithms.

use std::collections::HashMap;
use std::fmt::Display;
use std::hash::Hash;
use std::io::Write;

use crate::dfs::DepthFirstSearch;
use crate::tarjan::TarjanComponents;
use crate::Digraph;

pub fn write_report<V, W>(digraph: &Digraph<V>, output: &mut W) -> std::io::Result<()>
where
    V: Clone + Eq + Hash + Display,
    W: Write,
{
    writeln!(output, "Digraph:")?;
    writeln!(output, "# Vertices: {}", digraph.get_vertex_count())?;
    writeln!(output, "# Edges: {}", digraph.get_edge_count())?;
    writeln!(output)?;

    write!(output, "Vertices:")?;
    for v in digraph.iter_vertices() {
        write!(output, " {v}")?;
    }
    writeln!(output)?;
    writeln!(output)?;

    write_edges(output, "Edges:", digraph)?;

    let dfs = DepthFirstSearch::new(digraph);
    writeln!(output, "DFS:")?;
    write_map(output, "Pre:", digraph, dfs.pre_times())?;
    write_map(output, "Post:", digraph, dfs.post_times())?;
    write_map(output, "Parents:", digraph, dfs.parents())?;
    write_edges(
        output,
        &format!("Back Edges: {}", dfs.back().get_edge_count()),
        dfs.back(),
    )?;
    write_edges(
        output,
        &format!("Forward Edges: {}", dfs.forward().get_edge_count()),
        dfs.forward(),
    )?;
    write_edges(
        output,
        &format!("Cross Edges: {}", dfs.cross().get_edge_count()),
        dfs.cross(),
    )?;

    if dfs.back().get_edge_count() == 0 {
        writeln!(output, "Digraph is acyclic.")?;
        write!(output, "Topological Order:")?;
        for v in dfs.topological_order() {
            write!(output, " {v}")?;
        }
        writeln!(output)?;
    } else {
        writeln!(output, "Digraph is not acyclic.")?;
    }
    writeln!(output)?;

    write_map(
        output,
        "Kosaraju Strongly Connected Components:",
        digraph,
        &digraph.kosaraju_components(),
    )?;
    let tarjan = TarjanComponents::new(digraph);
    write_map(
        output,
        "Tarjan Strongly Connected Components:",
        digraph,
        tarjan.components(),
    )?;
    Ok(())
}

fn write_edges<V, W>(output: &mut W, title: &str, digraph: &Digraph<V>) -> std::io::Result<()>
where
    V: Clone + Eq + Hash + Display,
    W: Write,
{
    writeln!(output, "{title}")?;
    for (v, w) in digraph.iter_edges() {
        writeln!(output, "{v} {w}")?;
    }
    writeln!(output)
}

// Entries follow the digraph's vertex order so the report is stable.
fn write_map<V, T, W>(
    output: &mut W,
    title: &str,
    digraph: &Digraph<V>,
    map: &HashMap<V, T>,
) -> std::io::Result<()>
where
    V: Clone + Eq + Hash + Display,
    T: Display,
    W: Write,
{
    writeln!(output, "{title}")?;
    for v in digraph.iter_vertices() {
        if let Some(value) = map.get(v) {
            writeln!(output, "{v}: {value}")?;
        }
    }
    writeln!(output)
}
