#![cfg(target_arch = "wasm32")]

use wasm_bindgen::{JsCast, JsValue};
use web_sys::{Document, Node};

const STYLE_TAG_SELECTOR: &str = "style[data-labs-ui]";

/// Default CSS for the component along with easy-to-override design tokens.
pub const DEFAULT_STYLES: &str = r#"
:root {
  --labs-font-family: 'Inter', system-ui, -apple-system, BlinkMacSystemFont, 'Segoe UI', sans-serif;
  --labs-bg: #ffffff;
  --labs-surface: #f8fafc;
  --labs-border: rgba(148, 163, 184, 0.28);
  --labs-radius: 16px;
  --labs-text: #1f2933;
  --labs-muted: #52606d;
  --labs-accent: #2563eb;
  --labs-accent-soft: rgba(37, 99, 235, 0.12);
  --labs-mean: #059669;
  --labs-above: #b42318;
  --labs-above-bg: rgba(180, 35, 24, 0.1);
  --labs-below: #0b5394;
  --labs-below-bg: rgba(11, 83, 148, 0.12);
  --labs-normal: #067647;
  --labs-normal-bg: rgba(6, 118, 71, 0.12);
  --labs-excluded: #9aa5b1;
}

.labs-root {
  display: grid;
  grid-template-columns: minmax(240px, 320px) 1fr;
  gap: 1.5rem;
  font-family: var(--labs-font-family);
  color: var(--labs-text);
}

.labs-sidebar,
.labs-panel {
  background: var(--labs-bg);
  border: 1px solid var(--labs-border);
  border-radius: var(--labs-radius);
  padding: 1rem 1.25rem;
}

.labs-sidebar-header {
  display: flex;
  align-items: center;
  gap: 0.5rem;
}

.labs-search input {
  width: 100%;
  padding: 0.5rem 0.75rem;
  border: 1px solid var(--labs-border);
  border-radius: 10px;
  font: inherit;
}

.labs-categories,
.labs-analytes {
  list-style: none;
  margin: 0.75rem 0 0;
  padding: 0;
}

.labs-category-toggle,
.labs-analyte {
  display: flex;
  width: 100%;
  align-items: center;
  justify-content: space-between;
  gap: 0.5rem;
  padding: 0.5rem 0.75rem;
  border: none;
  border-radius: 10px;
  background: transparent;
  font: inherit;
  text-align: left;
  cursor: pointer;
}

.labs-category-toggle:hover,
.labs-analyte:hover {
  background: var(--labs-surface);
}

.labs-category-name {
  flex: 1;
  font-weight: 600;
}

.labs-analytes {
  margin: 0 0 0.5rem 1.5rem;
}

.labs-analyte.is-selected {
  background: var(--labs-accent-soft);
  color: var(--labs-accent);
  font-weight: 600;
}

.labs-count,
.labs-tag {
  padding: 0.1rem 0.5rem;
  border-radius: 999px;
  background: var(--labs-surface);
  font-size: 0.75rem;
}

.labs-muted {
  color: var(--labs-muted);
  font-size: 0.85rem;
}

.labs-selection {
  display: flex;
  flex-wrap: wrap;
  align-items: center;
  gap: 0.5rem;
  margin-bottom: 1rem;
}

.labs-placeholder {
  display: grid;
  place-items: center;
  min-height: 240px;
  color: var(--labs-muted);
}

.labs-error,
.labs-retry {
  color: var(--labs-above);
}

.labs-cards {
  display: grid;
  grid-template-columns: repeat(4, minmax(0, 1fr));
  gap: 0.75rem;
  margin: 1rem 0;
}

.labs-card {
  display: flex;
  flex-direction: column;
  gap: 0.25rem;
  padding: 0.75rem 1rem;
  border-radius: 12px;
  background: var(--labs-surface);
}

.labs-card-label {
  font-size: 0.75rem;
  font-weight: 500;
  color: var(--labs-muted);
}

.labs-card[data-trend="up"] strong { color: var(--labs-above); }
.labs-card[data-trend="down"] strong { color: var(--labs-below); }

.labs-chart {
  width: 100%;
  height: auto;
  font-size: 12px;
}

.labs-grid line {
  stroke: var(--labs-border);
  stroke-dasharray: 3 3;
}

.labs-grid text,
.labs-axis-label {
  fill: var(--labs-muted);
}

.labs-area {
  fill: var(--labs-accent-soft);
}

.labs-line {
  fill: none;
  stroke: var(--labs-accent);
  stroke-width: 2.5;
}

.labs-mean {
  stroke: var(--labs-mean);
  stroke-dasharray: 6 4;
}

.labs-mean-label {
  fill: var(--labs-mean);
  font-weight: 600;
}

.labs-marker {
  fill: var(--labs-bg);
  stroke: var(--labs-accent);
  stroke-width: 2;
  cursor: pointer;
}

.labs-marker.is-hovered {
  fill: var(--labs-accent);
}

.labs-marker.is-excluded {
  stroke: var(--labs-excluded);
  stroke-dasharray: 2 2;
  opacity: 0.6;
}

.labs-tooltip rect {
  fill: #11181c;
  opacity: 0.9;
}

.labs-tooltip text {
  fill: #ffffff;
}

.labs-tooltip-value {
  font-weight: 600;
}

.labs-table header {
  display: flex;
  align-items: center;
  justify-content: space-between;
  margin-top: 1.25rem;
}

.labs-table table {
  width: 100%;
  border-collapse: collapse;
}

.labs-table th,
.labs-table td {
  padding: 0.5rem 0.75rem;
  border-bottom: 1px solid var(--labs-border);
  text-align: left;
}

.labs-table tr.is-excluded td {
  color: var(--labs-excluded);
  text-decoration: line-through;
}

.labs-deviation {
  padding: 0.1rem 0.5rem;
  border-radius: 999px;
  font-size: 0.75rem;
}

.labs-deviation[data-band="normal"] { color: var(--labs-normal); background: var(--labs-normal-bg); }
.labs-deviation[data-band="above"] { color: var(--labs-above); background: var(--labs-above-bg); }
.labs-deviation[data-band="below"] { color: var(--labs-below); background: var(--labs-below-bg); }

@media (max-width: 900px) {
  .labs-root {
    grid-template-columns: 1fr;
  }

  .labs-cards {
    grid-template-columns: repeat(2, minmax(0, 1fr));
  }
}
"#;

pub fn ensure_styles(document: &Document) -> Result<(), JsValue> {
    if document.query_selector(STYLE_TAG_SELECTOR)?.is_some() {
        return Ok(());
    }

    let head = document
        .head()
        .ok_or_else(|| JsValue::from_str("Document không có thẻ <head>"))?;

    let style_el = document.create_element("style")?;
    style_el.set_attribute("data-labs-ui", "v1")?;
    style_el.set_text_content(Some(DEFAULT_STYLES));
    head.append_child(&style_el.clone().dyn_into::<Node>()?)?;

    Ok(())
}
