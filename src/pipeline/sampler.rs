//! Per-memo sampling.
//!
//! A handful of memos ("☕️ Coffee", "🛒 Groceries") appear thousands of
//! times in a typical export. Grouping by exact memo text and keeping a
//! random subset of each group stops them from dominating the dataset.

use std::collections::HashMap;

use rand::Rng;
use rand::seq::SliceRandom;

use crate::pipeline::types::ClassifiedRecord;

/// Keep at most `cap` uniformly chosen records per distinct memo.
///
/// Groups are emitted in the order their memo first appears; records within
/// a group are in shuffled order.
pub fn sample_by_memo<R>(records: Vec<ClassifiedRecord>, cap: usize, rng: &mut R) -> Vec<ClassifiedRecord>
where
    R: Rng + ?Sized,
{
    let mut groups: Vec<Vec<ClassifiedRecord>> = Vec::new();
    let mut index: HashMap<String, usize> = HashMap::new();

    for record in records {
        match index.get(&record.memo) {
            Some(&i) => groups[i].push(record),
            None => {
                index.insert(record.memo.clone(), groups.len());
                groups.push(vec![record]);
            }
        }
    }

    let mut kept = Vec::new();
    for mut group in groups {
        group.shuffle(rng);
        group.truncate(cap);
        kept.extend(group);
    }
    kept
}
