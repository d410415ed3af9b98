//! Compaction: применение набора удалений через swap-with-last
//!
//! Удаления ОБЯЗАТЕЛЬНО идут от старшего индекса к младшему:
//! - при удалении `i` все помеченные индексы > i уже убраны,
//!   значит источник swap (`live - 1`) либо сам `i`, либо выживший;
//! - иначе источник может оказаться помеченным-но-ещё-не-удалённым
//!   slot'ом и "воскреснуть", а выживший - потеряться.
//!
//! Входной порядок НЕ предполагается: индексы сортируются здесь.

use super::ProjectileBatch;

/// Сортировка по убыванию (in place, без аллокаций)
pub fn sort_descending(indices: &mut [usize]) {
    indices.sort_unstable_by(|a, b| b.cmp(a));
}

/// Удаляет все `marked` slots из batch.
///
/// `on_swap(slot, source)` вызывается на каждый swap - для зеркалирования
/// в параллельных буферах (render transforms). Дубликаты в `marked` игнорируются.
/// Возвращает число реально удалённых slots.
pub fn remove_marked(
    batch: &mut ProjectileBatch,
    marked: &mut [usize],
    mut on_swap: impl FnMut(usize, usize),
) -> usize {
    sort_descending(marked);

    let mut removed = 0;
    let mut previous = None;

    for &slot in marked.iter() {
        if previous == Some(slot) {
            continue;
        }
        previous = Some(slot);

        if let Some(source) = batch.remove_swap_last(slot) {
            on_swap(slot, source);
            removed += 1;
        }
    }

    removed
}
