//! Split a question budget across themes.

use crate::themes::ThemeDescriptor;

/// Questions requested from one theme
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ThemeBudget {
    /// Position of the theme in the input slice
    pub theme_index: usize,
    pub count: usize,
}

/// Give each theme `target_count / n` questions, in importance-descending
/// order, with the last theme taking the remainder.
///
/// The shares always add up to `target_count` when there is at least one
/// theme. A theme that later yields fewer questions than its share keeps the
/// shortfall: nothing is handed over to the other themes.
pub fn allocate(themes: &[ThemeDescriptor], target_count: usize) -> Vec<ThemeBudget> {
    if themes.is_empty() || target_count == 0 {
        return Vec::new();
    }

    let mut order: Vec<usize> = (0..themes.len()).collect();
    order.sort_by(|&a, &b| themes[b].importance.cmp(&themes[a].importance));

    let share = target_count / themes.len();
    let remainder = target_count % themes.len();
    let last = order.len() - 1;

    order
        .into_iter()
        .enumerate()
        .map(|(pos, theme_index)| ThemeBudget {
            theme_index,
            count: if pos == last { share + remainder } else { share },
        })
        .collect()
}
