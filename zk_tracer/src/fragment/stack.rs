use ethereum_types::U256;
use zk_tracer_common::EncodedWord;

use crate::error::TraceError;
use crate::trace::{Row, RowBuilder};

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct StackItem {
    /// Height of the stack with the item on top.
    pub height: usize,
    pub is_pop: bool,
    pub value: U256,
}

/// Stack traffic of one step: pops top first, then pushes bottom first.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct StackFragment {
    pub hub_stamp: usize,
    pub items: Vec<StackItem>,
}

impl StackFragment {
    /// Lays out the stack items of a step starting from a stack of `height`.
    /// `popped` and `pushed` are both given top first. Returns `None` when
    /// the step does not touch the stack.
    pub fn new(hub_stamp: usize, height: usize, popped: &[U256], pushed: &[U256]) -> Option<Self> {
        if popped.is_empty() && pushed.is_empty() {
            return None;
        }
        let pops = popped.iter().enumerate().map(|(i, &value)| StackItem {
            height: height - i,
            is_pop: true,
            value,
        });
        let base = height - popped.len();
        let pushes = pushed.iter().rev().enumerate().map(|(i, &value)| StackItem {
            height: base + i + 1,
            is_pop: false,
            value,
        });
        Some(Self {
            hub_stamp,
            items: pops.chain(pushes).collect(),
        })
    }

    pub(super) fn rows(&self, row: impl Fn() -> RowBuilder) -> Result<Vec<Row>, TraceError> {
        self.items
            .iter()
            .map(|item| {
                row()
                    .set("HUB_STAMP", self.hub_stamp)
                    .set("HEIGHT", item.height)
                    .flag("IS_POP", item.is_pop)
                    .word("VALUE_HI", "VALUE_LO", EncodedWord::from(item.value))
                    .finish()
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pops_then_pushes() {
        // ADD on a stack [.., 2, 3] leaving [.., 5].
        let fragment =
            StackFragment::new(1, 4, &[3.into(), 2.into()], &[5.into()]).unwrap();
        let layout: Vec<_> = fragment
            .items
            .iter()
            .map(|item| (item.height, item.is_pop, item.value.as_u64()))
            .collect();
        assert_eq!(layout, vec![(4, true, 3), (3, true, 2), (3, false, 5)]);
    }

    #[test]
    fn pushes_bottom_first() {
        // DUP2 on [.., 7, 9]: reads 9 and 7, leaves [.., 7, 9, 7].
        let fragment = StackFragment::new(
            1,
            2,
            &[9.into(), 7.into()],
            &[7.into(), 9.into(), 7.into()],
        )
        .unwrap();
        let pushes: Vec<_> = fragment
            .items
            .iter()
            .filter(|item| !item.is_pop)
            .map(|item| (item.height, item.value.as_u64()))
            .collect();
        assert_eq!(pushes, vec![(1, 7), (2, 9), (3, 7)]);
    }

    #[test]
    fn untouched_stack() {
        assert_eq!(StackFragment::new(1, 0, &[], &[]), None);
    }
}
