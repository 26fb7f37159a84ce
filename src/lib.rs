pub mod chart;
pub mod config;
pub mod experiment;
pub mod virtmem;

#[cfg(all(target_arch = "wasm32", target_os = "unknown"))]
use wasm_bindgen::prelude::*;

#[cfg(all(target_arch = "wasm32", target_os = "unknown"))]
#[wasm_bindgen]
pub fn render_chart(data: &str, program: &str) -> String {
    use config::DEFAULT_ALGORITHMS;

    let table = match experiment::parse(data, &DEFAULT_ALGORITHMS) {
        Ok(table) => table,
        Err(e) => return format!("failed to parse experiment data: {e}"),
    };

    match chart::render_to_string(&table, program, &DEFAULT_ALGORITHMS, (800, 600)) {
        Ok(svg) => svg,
        Err(e) => e.to_string(),
    }
}
