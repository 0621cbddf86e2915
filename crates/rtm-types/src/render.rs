//! Diagnostic text rendering of a routing table
//!
//! Produces a column-aligned view for the operator console. Not part of the
//! wire protocol.

use std::fmt::Write;

use crate::entry::address_to_string;
use crate::table::RoutingTable;

const HEADERS: [&str; 4] = ["Key", "Destination IP/Mask", "Gateway IP", "OIF"];

impl RoutingTable {
    /// Render the table as aligned text, one row per entry in ascending key
    /// order. Column widths grow with the widest cell, header included.
    pub fn render(&self) -> String {
        let rows: Vec<[String; 4]> = self
            .iter()
            .map(|e| {
                [
                    address_to_string(e.destination),
                    e.destination_prefix(),
                    address_to_string(e.gateway),
                    e.interface.clone(),
                ]
            })
            .collect();

        let mut widths = [0usize; 4];
        for (w, h) in widths.iter_mut().zip(HEADERS) {
            *w = h.len();
        }
        for row in &rows {
            for (w, cell) in widths.iter_mut().zip(row) {
                *w = (*w).max(cell.len());
            }
        }

        let mut out = String::new();
        write_row(&mut out, &widths, &HEADERS.map(String::from));

        // Header separator.
        out.push('|');
        for w in widths {
            out.push(' ');
            out.push_str(&"-".repeat(w));
            out.push_str(" |");
        }
        out.push('\n');

        for row in &rows {
            write_row(&mut out, &widths, row);
        }
        out
    }
}

fn write_row(out: &mut String, widths: &[usize; 4], cells: &[String; 4]) {
    out.push('|');
    for (w, cell) in widths.iter().zip(cells) {
        let _ = write!(out, " {:<width$} |", cell, width = w);
    }
    out.push('\n');
}
