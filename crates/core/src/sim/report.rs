//! Hierarchy configuration and device statistics reports.

use crate::hierarchy::{Device, Hierarchy};
use crate::stats::percent;
use crate::trace::RequestSink;

/// Prints every cache of the hierarchy with its geometry and parent.
pub fn print_configuration<S: RequestSink>(hierarchy: &Hierarchy<S>) {
    println!("Simulating with the following configuration:");
    for id in hierarchy.leaf_first_order() {
        let parent = hierarchy
            .parent(id)
            .map_or("-", |p| hierarchy.device(p).name());
        match hierarchy.device(id) {
            Device::Cache(c) => println!(
                "  {} ({}-way, {} bytes) -> {}",
                c.name(),
                c.array.ways(),
                c.size_bytes(),
                parent
            ),
            Device::TagCache(t) => {
                println!("  {} ({}-way, {} bytes)", t.name(), t.ways(), t.size_bytes());
            }
            Device::Controller(c) => println!("  {}", c.name()),
        }
    }
    println!(
        "  line size {} bytes, {} capabilities per line",
        hierarchy.layout().line_bytes(),
        hierarchy.layout().caps_per_line()
    );
}

/// Prints the counters of every device, leaves first.
pub fn print_statistics<S: RequestSink>(hierarchy: &Hierarchy<S>) {
    println!("\n==========================================================");
    println!("DEVICE STATISTICS");
    println!("==========================================================");
    for id in hierarchy.leaf_first_order() {
        match hierarchy.device(id) {
            Device::Cache(c) => {
                let s = &c.stats;
                println!(
                    "  {:<6} hits: {:<10} misses: {:<10} invalidations: {:<10} write backs: {:<10} miss rate: {:.2}%",
                    c.name(),
                    s.hits,
                    s.misses,
                    s.invalidations,
                    s.write_backs,
                    s.miss_rate() * 100.0
                );
            }
            Device::Controller(c) => {
                let s = &c.stats;
                let total = s.reads + s.writes;
                println!("  {}", c.name());
                println!(
                    "    reads: {:<10} ({:.2}%)   writes: {:<10} ({:.2}%)",
                    s.reads,
                    percent(s.reads, total),
                    s.writes,
                    percent(s.writes, total)
                );
                print_table(c.table());
            }
            Device::TagCache(t) => {
                let s = &t.stats;
                println!("  {}", t.name());
                println!(
                    "    hits: {:<10} misses: {:<10} write backs: {:<10} miss rate: {:.2}%",
                    s.hits,
                    s.misses,
                    s.write_backs,
                    s.miss_rate() * 100.0
                );
                print_table(t.table());
            }
        }
    }
    println!("==========================================================");
}

fn print_table(table: &crate::memory::TagTable) {
    println!(
        "    tags known: {:<10} tags set: {}",
        table.known_count(),
        table.set_count()
    );
}
