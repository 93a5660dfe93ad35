//! Cây danh mục xét nghiệm: tìm kiếm, mở/đóng nhóm và đánh dấu lựa chọn.

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

use crate::{CategoryTree, LabCategory};

/// Chuẩn hoá từ khoá: bỏ khoảng trắng hai đầu, chữ thường (Unicode).
pub fn normalize_query(query: &str) -> String {
    query.trim().to_lowercase()
}

/// Giữ lại các chỉ số có tên chứa từ khoá; nhóm rỗng bị loại.
pub fn filter_tree(tree: &CategoryTree, query: &str) -> Vec<LabCategory> {
    let needle = normalize_query(query);
    if needle.is_empty() {
        return tree.categories.clone();
    }

    tree.categories
        .iter()
        .filter_map(|category| {
            let analytes: Vec<_> = category
                .analytes
                .iter()
                .filter(|analyte| analyte.canonical_name.to_lowercase().contains(&needle))
                .cloned()
                .collect();
            if analytes.is_empty() {
                None
            } else {
                Some(LabCategory {
                    name: category.name.clone(),
                    analytes,
                })
            }
        })
        .collect()
}

pub fn category_icon(name: &str) -> &'static str {
    match name {
        "Общий анализ крови" => "🩸",
        "Биохимия крови" => "🧪",
        "Липидный профиль" => "💧",
        "Коагулограмма" => "🩹",
        "Гормоны" => "⚗️",
        "Витамины и микроэлементы" => "💊",
        "Маркеры воспаления" => "🔥",
        "Общий анализ мочи" => "🚽",
        "Инфекции" => "🦠",
        "Микробиология" => "🔬",
        "Онкомаркеры" => "🎯",
        "Аутоиммунные маркеры" => "🛡️",
        _ => "📋",
    }
}

/// Trạng thái giao diện của cây danh mục.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CatalogState {
    query: String,
    expanded: BTreeSet<String>,
}

impl CatalogState {
    pub fn query(&self) -> &str {
        &self.query
    }

    pub fn is_expanded(&self, category: &str) -> bool {
        self.expanded.contains(category)
    }

    /// Khi có từ khoá, mọi nhóm còn lại được mở; xoá từ khoá thì thu gọn hết.
    pub fn set_query(&mut self, tree: &CategoryTree, query: &str) {
        self.query = query.to_string();
        if normalize_query(query).is_empty() {
            self.expanded.clear();
            return;
        }

        self.expanded = filter_tree(tree, query)
            .into_iter()
            .map(|category| category.name)
            .collect();
    }

    pub fn toggle_category(&mut self, category: &str) {
        if !self.expanded.remove(category) {
            self.expanded.insert(category.to_string());
        }
    }

    /// Mở nhóm đầu tiên chứa chỉ số; trả về `false` nếu không tìm thấy.
    pub fn expand_for_analyte(&mut self, tree: &CategoryTree, canonical_name: &str) -> bool {
        match tree.category_of(canonical_name) {
            Some(category) => {
                self.expanded.insert(category.name.clone());
                true
            }
            None => false,
        }
    }

    pub fn view(&self, tree: &CategoryTree, selected: Option<&str>) -> CatalogView {
        let categories = filter_tree(tree, &self.query)
            .into_iter()
            .map(|category| CategoryEntry {
                icon: category_icon(&category.name).to_string(),
                analyte_count: category.analytes.len(),
                expanded: self.is_expanded(&category.name),
                analytes: category
                    .analytes
                    .into_iter()
                    .map(|analyte| AnalyteEntry {
                        selected: selected == Some(analyte.canonical_name.as_str()),
                        canonical_name: analyte.canonical_name,
                        standard_unit: analyte.standard_unit,
                        measurement_count: analyte.measurement_count,
                    })
                    .collect(),
                name: category.name,
            })
            .collect();

        CatalogView {
            query: self.query.clone(),
            total_analytes: tree.total_analytes(),
            categories,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CatalogView {
    pub query: String,
    pub total_analytes: usize,
    pub categories: Vec<CategoryEntry>,
}

impl CatalogView {
    pub fn is_empty(&self) -> bool {
        self.categories.is_empty()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CategoryEntry {
    pub name: String,
    pub icon: String,
    pub analyte_count: usize,
    pub expanded: bool,
    pub analytes: Vec<AnalyteEntry>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct AnalyteEntry {
    pub canonical_name: String,
    pub standard_unit: Option<String>,
    pub measurement_count: u32,
    pub selected: bool,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::AnalyteSummary;

    fn analyte(name: &str, unit: Option<&str>, count: u32) -> AnalyteSummary {
        AnalyteSummary {
            canonical_name: name.to_string(),
            standard_unit: unit.map(str::to_string),
            measurement_count: count,
        }
    }

    fn tree() -> CategoryTree {
        CategoryTree {
            categories: vec![
                LabCategory {
                    name: "Общий анализ крови".into(),
                    analytes: vec![
                        analyte("Гемоглобин", Some("г/л"), 6),
                        analyte("Эритроциты", Some("10^12/л"), 5),
                    ],
                },
                LabCategory {
                    name: "Биохимия крови".into(),
                    analytes: vec![
                        analyte("Глюкоза", Some("ммоль/л"), 4),
                        analyte("Гликированный гемоглобин", Some("%"), 2),
                    ],
                },
                LabCategory {
                    name: "Гормоны".into(),
                    analytes: vec![analyte("ТТГ", Some("мМЕ/л"), 3)],
                },
            ],
        }
    }

    #[test]
    fn search_is_case_insensitive_and_drops_empty_categories() {
        let filtered = filter_tree(&tree(), "  ГЕМОГЛОБИН ");
        let names: Vec<_> = filtered.iter().map(|c| c.name.as_str()).collect();
        assert_eq!(names, vec!["Общий анализ крови", "Биохимия крови"]);
        assert_eq!(filtered[0].analytes.len(), 1);
        assert_eq!(filtered[1].analytes[0].canonical_name, "Гликированный гемоглобин");
    }

    #[test]
    fn empty_query_returns_whole_tree() {
        assert_eq!(filter_tree(&tree(), "   "), tree().categories);
    }

    #[test]
    fn search_expands_matches_and_clearing_resets() {
        let tree = tree();
        let mut state = CatalogState::default();
        state.toggle_category("Гормоны");

        state.set_query(&tree, "гемоглобин");
        assert!(state.is_expanded("Общий анализ крови"));
        assert!(state.is_expanded("Биохимия крови"));
        assert!(!state.is_expanded("Гормоны"));

        let view = state.view(&tree, None);
        assert_eq!(view.categories.len(), 2);
        assert!(view.categories.iter().all(|c| c.expanded));

        state.set_query(&tree, "");
        let view = state.view(&tree, None);
        assert_eq!(view.categories.len(), 3);
        assert!(view.categories.iter().all(|c| !c.expanded));
    }

    #[test]
    fn no_match_yields_empty_view() {
        let tree = tree();
        let mut state = CatalogState::default();
        state.set_query(&tree, "ферритин");
        let view = state.view(&tree, None);
        assert!(view.is_empty());
        assert_eq!(view.total_analytes, 5);
    }

    #[test]
    fn selected_analyte_expands_its_category() {
        let tree = tree();
        let mut state = CatalogState::default();
        assert!(state.expand_for_analyte(&tree, "ТТГ"));
        assert!(!state.expand_for_analyte(&tree, "Неизвестный"));

        let view = state.view(&tree, Some("ТТГ"));
        let hormones = view
            .categories
            .iter()
            .find(|c| c.name == "Гормоны")
            .unwrap();
        assert!(hormones.expanded);
        assert!(hormones.analytes[0].selected);
        assert_eq!(hormones.icon, "⚗️");
        let selected: usize = view
            .categories
            .iter()
            .flat_map(|c| c.analytes.iter())
            .filter(|a| a.selected)
            .count();
        assert_eq!(selected, 1);
    }

    #[test]
    fn manual_toggle_flips_expansion() {
        let mut state = CatalogState::default();
        state.toggle_category("Гормоны");
        assert!(state.is_expanded("Гормоны"));
        state.toggle_category("Гормоны");
        assert!(!state.is_expanded("Гормоны"));
    }
}
