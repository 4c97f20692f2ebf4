use std::collections::BTreeSet;

use arch::inst::Inst;
use bimap::BiMap;

/// Jump targets found in one listing. Label ids follow target offsets in
/// ascending order, whatever order the jumps appear in.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Labels {
    // offset <-> id
    labels: BiMap<usize, usize>,
    // (index of the jump, absolute target it asked for)
    unresolved: Vec<(usize, i64)>,
}

impl Labels {
    pub fn label(&self, offset: usize) -> Option<usize> {
        self.labels.get_by_left(&offset).copied()
    }

    pub fn offset_of(&self, id: usize) -> Option<usize> {
        self.labels.get_by_right(&id).copied()
    }

    pub fn len(&self) -> usize {
        self.labels.len()
    }

    pub fn is_empty(&self) -> bool {
        self.labels.is_empty()
    }

    /// Jumps whose target is not the first byte of any instruction.
    pub fn unresolved(&self) -> &[(usize, i64)] {
        &self.unresolved
    }

    pub fn is_unresolved(&self, index: usize) -> bool {
        self.unresolved.iter().any(|(i, _)| *i == index)
    }
}

/// Marks every instruction some relative jump lands on and numbers them.
/// `insts` must be a decode result: sorted and contiguous by offset.
pub fn resolve(insts: &mut [Inst]) -> Labels {
    let mut found = BTreeSet::new();
    let mut unresolved = vec![];

    for index in 0..insts.len() {
        let Some(target) = insts[index].jump_target() else {
            continue;
        };
        let hit = usize::try_from(target)
            .ok()
            .and_then(|target| insts.binary_search_by_key(&target, |i| i.offset).ok());
        match hit {
            Some(at) => {
                insts[at].target = true;
                found.insert(insts[at].offset);
            }
            None => unresolved.push((index, target)),
        }
    }

    let labels = found.into_iter().enumerate().map(|(id, offset)| (offset, id)).collect();
    Labels { labels, unresolved }
}
