#![forbid(unsafe_code)]
//! A deduction-based solver for order-`n` Latin squares.
//!
//! The solver maintains, for every cell, a bit-packed candidate mask (bit
//! `d-1` set means digit `d` is still possible there) alongside per-row and
//! per-column "digit already placed" masks. A battery of deduction passes —
//! ordered from cheapest to most expensive — is run to a fixpoint; if the
//! grid is not fully determined once every pass stalls, bounded recursive
//! search takes over. The search clones the whole state per branch rather
//! than maintaining undo logs: branching factors stay small in practice, so
//! the clone is cheaper than bookkeeping for incremental retraction.

use thiserror::Error;
use tracing::instrument;

/// How hard a puzzle was to crack, in terms of the deduction machinery that
/// had to be brought to bear. Variants are declared in increasing order of
/// cost, so `Difficulty` derives `Ord` directly from declaration order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Difficulty {
    /// Naked singles and positional (hidden single) elimination only.
    Simple,
    /// Naked/hidden subset elimination within a single row or column.
    Set0,
    /// Subset elimination plus the row/column cross-section ("extreme")
    /// pass for a single digit.
    Set1,
    /// Forcing chains through bivalue cells.
    Forcing,
    /// Bounded backtracking search was required.
    Recursion,
}

/// Outcome of a solve attempt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SolveOutcome {
    /// The clues are contradictory; no completion exists.
    Impossible,
    /// Deduction stalled with cells still open, and recursive search was
    /// not permitted (`max_difficulty < Difficulty::Recursion`).
    Unfinished,
    /// Exactly one completion exists.
    Solved {
        grid: Vec<u8>,
        difficulty: Difficulty,
    },
    /// Two or more completions exist.
    Ambiguous,
}

/// Candidates are packed one bit per digit in a `u32` cell mask, so no
/// order above this is representable.
const MAX_ORDER: u8 = 32;

#[derive(Debug, Error)]
pub enum LatinError {
    #[error("order must be at least 1, got {0}")]
    InvalidOrder(u8),
    #[error("order {0} exceeds this crate's u32-candidate-mask limit of {MAX_ORDER}")]
    OrderTooLarge(u8),
    #[error("grid length mismatch: expected {expected} cells, got {actual}")]
    GridLengthMismatch { expected: usize, actual: usize },
    #[error("digit {digit} out of range for order {order}")]
    DigitOutOfRange { digit: u8, order: u8 },
}

/// A caller-supplied deduction, tried alongside the built-in passes at a
/// chosen [`Difficulty`] tier. Implementations mutate the state directly via
/// [`LatinState::place`] or [`LatinState::eliminate`] and report whether they
/// made progress.
pub trait Deduction {
    fn try_apply(&self, state: &mut LatinState) -> bool;
}

/// User deduction hooks, one slice per built-in difficulty tier they should
/// run alongside. All tiers default to empty.
#[derive(Default)]
pub struct UserDeductions<'a> {
    pub simple: &'a [&'a dyn Deduction],
    pub set0: &'a [&'a dyn Deduction],
    pub set1: &'a [&'a dyn Deduction],
    pub forcing: &'a [&'a dyn Deduction],
}

fn digit_bit(d: u8) -> u32 {
    1u32 << (d - 1)
}

fn full_mask(order: u8) -> u32 {
    if order >= 32 {
        u32::MAX
    } else {
        (1u32 << order) - 1
    }
}

/// The candidate cube plus placement state for one square in progress.
///
/// Invariant: for a placed cell `grid[i] = n`, `cube[i]` has exactly bit
/// `n-1` set. For a blank cell, `cube[i]` holds every digit not yet ruled
/// out by a clue or deduction in its row or column.
#[derive(Debug, Clone)]
pub struct LatinState {
    order: u8,
    grid: Vec<u8>,
    cube: Vec<u32>,
    row_has: Vec<u32>,
    col_has: Vec<u32>,
}

impl LatinState {
    pub fn order(&self) -> u8 {
        self.order
    }

    pub fn grid(&self) -> &[u8] {
        &self.grid
    }

    pub fn candidates(&self, idx: usize) -> u32 {
        self.cube[idx]
    }

    pub fn is_filled(&self) -> bool {
        self.grid.iter().all(|&v| v != 0)
    }

    fn empty(order: u8) -> Self {
        let o = order as usize;
        let full = full_mask(order);
        Self {
            order,
            grid: vec![0; o * o],
            cube: vec![full; o * o],
            row_has: vec![0; o],
            col_has: vec![0; o],
        }
    }

    fn from_clues(initial: &[u8], order: u8) -> Result<Self, ()> {
        let o = order as usize;
        let mut state = Self::empty(order);
        for (idx, &v) in initial.iter().enumerate() {
            if v == 0 {
                continue;
            }
            let row = idx / o;
            let col = idx % o;
            let bit = digit_bit(v);
            if state.row_has[row] & bit != 0 || state.col_has[col] & bit != 0 {
                return Err(());
            }
            state.place(idx, v);
        }
        Ok(state)
    }

    /// Places `digit` at `idx`, collapsing its own candidate mask and
    /// eagerly striking `digit` from every other open cell in the same row
    /// and column. Keeps the candidate cube monotonically shrinking so
    /// deduction passes never have to rediscover "already placed" facts.
    pub fn place(&mut self, idx: usize, digit: u8) {
        let o = self.order as usize;
        let row = idx / o;
        let col = idx % o;
        let bit = digit_bit(digit);

        self.grid[idx] = digit;
        self.cube[idx] = bit;
        self.row_has[row] |= bit;
        self.col_has[col] |= bit;

        for c in 0..o {
            let j = row * o + c;
            if j != idx && self.grid[j] == 0 {
                self.cube[j] &= !bit;
            }
        }
        for r in 0..o {
            let j = r * o + col;
            if j != idx && self.grid[j] == 0 {
                self.cube[j] &= !bit;
            }
        }
    }

    /// Strikes `digit_mask` from an open cell's candidates. A no-op on
    /// already-placed cells. Exposed for user deduction hooks that want to
    /// eliminate without necessarily placing.
    pub fn eliminate(&mut self, idx: usize, digit_mask: u32) {
        if self.grid[idx] == 0 {
            self.cube[idx] &= !digit_mask;
        }
    }
}

fn has_contradiction(state: &LatinState) -> bool {
    state
        .grid
        .iter()
        .enumerate()
        .any(|(i, &v)| v == 0 && state.cube[i] == 0)
}

/// Iterates bit patterns of popcount `k` over `n` bits in increasing order,
/// via Gosper's hack: each step derives the next same-popcount pattern
/// directly from the current one, with no combinatorial index math.
fn combinations_gosper(k: usize, n: usize) -> impl Iterator<Item = u32> {
    let limit: u64 = 1u64 << n;
    let mut v: u64 = if k == 0 || k > n {
        limit
    } else {
        (1u64 << k) - 1
    };
    std::iter::from_fn(move || {
        if v >= limit {
            return None;
        }
        let cur = v as u32;
        let c = v & v.wrapping_neg();
        let r = v + c;
        v = (((r ^ v) >> 2) / c) | r;
        Some(cur)
    })
}

/// Naked-single and hidden-single (positional elimination) pass, applied to
/// every row and every column.
fn naked_single_pass(state: &mut LatinState) -> bool {
    let o = state.order as usize;
    let mut changed = false;
    for g in 0..o {
        let row: Vec<usize> = (0..o).map(|c| g * o + c).collect();
        changed |= scan_group(state, &row);
        let col: Vec<usize> = (0..o).map(|r| r * o + g).collect();
        changed |= scan_group(state, &col);
    }
    changed
}

fn scan_group(state: &mut LatinState, group: &[usize]) -> bool {
    let mut changed = false;

    for &idx in group {
        if state.grid[idx] != 0 {
            continue;
        }
        let mask = state.cube[idx];
        if mask != 0 && mask & (mask - 1) == 0 {
            let d = mask.trailing_zeros() as u8 + 1;
            state.place(idx, d);
            changed = true;
        }
    }

    for d in 1..=state.order {
        let bit = digit_bit(d);
        let mut only: Option<usize> = None;
        let mut count = 0u32;
        for &idx in group {
            if state.grid[idx] == 0 && state.cube[idx] & bit != 0 {
                count += 1;
                only = Some(idx);
            }
        }
        if count == 1 {
            let idx = only.unwrap();
            if state.grid[idx] == 0 {
                state.place(idx, d);
                changed = true;
            }
        }
    }

    changed
}

/// Naked/hidden subset elimination within a single row or column group, for
/// subset sizes strictly between 1 and `len(group) - 1`.
fn set_pass_group(state: &mut LatinState, group: &[usize]) -> bool {
    let unplaced: Vec<usize> = group.iter().copied().filter(|&i| state.grid[i] == 0).collect();
    let m = unplaced.len();
    if m < 4 {
        return false;
    }
    let mut changed = false;

    for k in 2..=(m - 2) {
        for pattern in combinations_gosper(k, m) {
            let mut union = 0u32;
            for b in 0..m {
                if pattern & (1 << b) != 0 {
                    union |= state.cube[unplaced[b]];
                }
            }
            if union.count_ones() as usize == k {
                for b in 0..m {
                    if pattern & (1 << b) == 0 {
                        let idx = unplaced[b];
                        let before = state.cube[idx];
                        state.cube[idx] &= !union;
                        changed |= state.cube[idx] != before;
                    }
                }
            }
        }
    }

    let free_digits: Vec<u8> = (1..=state.order)
        .filter(|&d| unplaced.iter().any(|&i| state.cube[i] & digit_bit(d) != 0))
        .collect();
    let fd = free_digits.len();
    if fd >= 4 {
        for k in 2..=(fd - 2) {
            for pattern in combinations_gosper(k, fd) {
                let mut digit_mask = 0u32;
                for b in 0..fd {
                    if pattern & (1 << b) != 0 {
                        digit_mask |= digit_bit(free_digits[b]);
                    }
                }
                let holders: Vec<usize> = unplaced
                    .iter()
                    .copied()
                    .filter(|&i| state.cube[i] & digit_mask != 0)
                    .collect();
                if holders.len() == k {
                    for &idx in &holders {
                        let before = state.cube[idx];
                        state.cube[idx] &= digit_mask;
                        changed |= state.cube[idx] != before;
                    }
                }
            }
        }
    }

    changed
}

/// Row/column cross-section elimination for a single digit (the classic
/// "X-wing"/"swordfish" shape generalised to arbitrary subset size):
/// if a digit's remaining candidate positions in `k` rows all fall inside
/// the same `k` columns, it cannot appear anywhere else in those columns.
fn cross_section_pass(state: &mut LatinState) -> bool {
    let o = state.order as usize;
    let mut changed = false;

    for d in 1..=state.order {
        let bit = digit_bit(d);
        let mut row_cols = vec![0u32; o];
        for r in 0..o {
            for c in 0..o {
                let idx = r * o + c;
                if state.grid[idx] == 0 && state.cube[idx] & bit != 0 {
                    row_cols[r] |= 1 << c;
                }
            }
        }
        let rows_with_d: Vec<usize> = (0..o).filter(|&r| row_cols[r] != 0).collect();
        let n = rows_with_d.len();
        if n < 4 {
            continue;
        }
        for k in 2..=(n - 2) {
            for pattern in combinations_gosper(k, n) {
                let mut union_cols = 0u32;
                for b in 0..n {
                    if pattern & (1 << b) != 0 {
                        union_cols |= row_cols[rows_with_d[b]];
                    }
                }
                if union_cols.count_ones() as usize != k {
                    continue;
                }
                let chosen: Vec<usize> = (0..n)
                    .filter(|&b| pattern & (1 << b) != 0)
                    .map(|b| rows_with_d[b])
                    .collect();
                for c in 0..o {
                    if union_cols & (1 << c) == 0 {
                        continue;
                    }
                    for r in 0..o {
                        if chosen.contains(&r) {
                            continue;
                        }
                        let idx = r * o + c;
                        if state.grid[idx] == 0 {
                            let before = state.cube[idx];
                            state.cube[idx] &= !bit;
                            changed |= state.cube[idx] != before;
                        }
                    }
                }
            }
        }
    }

    changed
}

fn set_pass(state: &mut LatinState, extreme: bool) -> bool {
    let o = state.order as usize;
    let mut changed = false;
    for g in 0..o {
        let row: Vec<usize> = (0..o).map(|c| g * o + c).collect();
        changed |= set_pass_group(state, &row);
        let col: Vec<usize> = (0..o).map(|r| r * o + g).collect();
        changed |= set_pass_group(state, &col);
    }
    if extreme {
        changed |= cross_section_pass(state);
    }
    changed
}

fn peers_of(order: u8, idx: usize) -> impl Iterator<Item = usize> {
    let o = order as usize;
    let row = idx / o;
    let col = idx % o;
    (0..o)
        .map(move |c| row * o + c)
        .chain((0..o).map(move |r| r * o + col))
        .filter(move |&j| j != idx)
}

/// Propagates the hypothesis "cell `start` takes `start_val`" through a
/// chain of bivalue cells sharing a row or column: whenever a reached cell's
/// two candidates include the forced value of its neighbour, it is itself
/// forced to its other candidate. Returns every cell this reaches, mapped to
/// its forced digit under the hypothesis.
fn propagate_branch(state: &LatinState, start: usize, start_val: u8) -> Vec<(usize, u8)> {
    use std::collections::VecDeque;

    let mut forced: Vec<(usize, u8)> = vec![(start, start_val)];
    let mut seen = vec![false; state.grid.len()];
    seen[start] = true;
    let mut queue = VecDeque::new();
    queue.push_back((start, start_val));

    while let Some((x, fx)) = queue.pop_front() {
        for y in peers_of(state.order, x) {
            if seen[y] || state.grid[y] != 0 {
                continue;
            }
            let mask = state.cube[y];
            if mask.count_ones() != 2 || mask & digit_bit(fx) == 0 {
                continue;
            }
            let other_bit = mask & !digit_bit(fx);
            let other = other_bit.trailing_zeros() as u8 + 1;
            seen[y] = true;
            forced.push((y, other));
            queue.push_back((y, other));
        }
    }

    forced
}

/// Forcing chains: for each bivalue cell, separately hypothesise each of
/// its two values and propagate through chains of other bivalue cells. A
/// cell reached under both hypotheses and forced to the *same* digit both
/// times is genuinely determined, independent of which value `start` turns
/// out to hold.
fn forcing_chain_pass(state: &mut LatinState) -> bool {
    let a = (state.order as usize) * (state.order as usize);
    let bivalue: Vec<usize> = (0..a)
        .filter(|&i| state.grid[i] == 0 && state.cube[i].count_ones() == 2)
        .collect();

    for start in bivalue {
        if state.grid[start] != 0 {
            continue;
        }
        let mask = state.cube[start];
        let da = mask.trailing_zeros() as u8 + 1;
        let db = (mask & (mask - 1)).trailing_zeros() as u8 + 1;

        let forced_a = propagate_branch(state, start, da);
        let forced_b = propagate_branch(state, start, db);

        let mut changed = false;
        for &(cell, va) in &forced_a {
            if cell == start || state.grid[cell] != 0 {
                continue;
            }
            if let Some(&(_, vb)) = forced_b.iter().find(|&&(c, _)| c == cell) {
                if va == vb {
                    state.place(cell, va);
                    changed = true;
                }
            }
        }
        if changed {
            return true;
        }
    }

    false
}

fn apply_builtin(state: &mut LatinState, level: Difficulty) -> bool {
    match level {
        Difficulty::Simple => naked_single_pass(state),
        Difficulty::Set0 => set_pass(state, false),
        Difficulty::Set1 => set_pass(state, true),
        Difficulty::Forcing => forcing_chain_pass(state),
        Difficulty::Recursion => false,
    }
}

fn apply_user_hooks(state: &mut LatinState, level: Difficulty, user: &UserDeductions<'_>) -> bool {
    let hooks: &[&dyn Deduction] = match level {
        Difficulty::Simple => user.simple,
        Difficulty::Set0 => user.set0,
        Difficulty::Set1 => user.set1,
        Difficulty::Forcing => user.forcing,
        Difficulty::Recursion => &[],
    };
    let mut changed = false;
    for hook in hooks {
        changed |= hook.try_apply(state);
    }
    changed
}

/// Runs one round of the deduction ladder: the first level (in increasing
/// cost order) that makes any progress wins, and its tier is returned so the
/// caller can record it as the recorded difficulty and restart the ladder
/// from the top.
fn apply_best_level(
    state: &mut LatinState,
    max_difficulty: Difficulty,
    user: &UserDeductions<'_>,
) -> Option<Difficulty> {
    const LEVELS: [Difficulty; 4] = [
        Difficulty::Simple,
        Difficulty::Set0,
        Difficulty::Set1,
        Difficulty::Forcing,
    ];
    let ceiling = max_difficulty.min(Difficulty::Forcing);
    for level in LEVELS {
        if level > ceiling {
            break;
        }
        let progressed = apply_builtin(state, level) | apply_user_hooks(state, level, user);
        if progressed {
            return Some(level);
        }
    }
    None
}

fn choose_branch_cell(state: &LatinState) -> Option<usize> {
    let mut best: Option<(usize, u32)> = None;
    for (idx, &v) in state.grid.iter().enumerate() {
        if v != 0 {
            continue;
        }
        let pop = state.cube[idx].count_ones();
        match best {
            None => best = Some((idx, pop)),
            Some((_, bp)) if pop < bp => best = Some((idx, pop)),
            _ => {}
        }
    }
    best.map(|(idx, _)| idx)
}

#[allow(clippy::too_many_arguments)]
fn recurse(
    state: &mut LatinState,
    max_difficulty: Difficulty,
    user: &UserDeductions<'_>,
    validator: Option<&dyn Fn(&[u8]) -> bool>,
    mut diff: Difficulty,
    count: &mut u32,
    first: &mut Option<(Vec<u8>, Difficulty)>,
    unfinished: &mut bool,
    limit: u32,
) {
    if has_contradiction(state) {
        return;
    }

    loop {
        match apply_best_level(state, max_difficulty, user) {
            Some(level) => {
                diff = diff.max(level);
                if has_contradiction(state) {
                    return;
                }
            }
            None => break,
        }
    }

    if state.is_filled() {
        let accepted = validator.map(|f| f(state.grid())).unwrap_or(true);
        if accepted {
            *count += 1;
            if first.is_none() {
                *first = Some((state.grid().to_vec(), diff));
            }
        }
        return;
    }

    if max_difficulty < Difficulty::Recursion {
        *unfinished = true;
        return;
    }

    let Some(cell) = choose_branch_cell(state) else {
        return;
    };
    let mut remaining = state.candidates(cell);
    while remaining != 0 {
        if *count >= limit {
            return;
        }
        let d = remaining.trailing_zeros() as u8 + 1;
        remaining &= remaining - 1;

        let mut branch = state.clone();
        branch.place(cell, d);
        recurse(
            &mut branch,
            max_difficulty,
            user,
            validator,
            Difficulty::Recursion,
            count,
            first,
            unfinished,
            limit,
        );
    }
}

/// Solves (or classifies) one Latin-square grid.
///
/// `initial` is a row-major grid of length `order * order`, `0` marking a
/// blank cell. Built-in deduction tiers at or below `max_difficulty` are
/// applied to a fixpoint; if the grid is still incomplete and
/// `max_difficulty` is [`Difficulty::Recursion`], bounded backtracking takes
/// over, enumerating up to two completions to distinguish a unique solution
/// from an ambiguous one. `validator`, if given, is consulted once a
/// completion is found and can reject it (e.g. an externally imposed
/// constraint the grid alone doesn't encode), causing the search to keep
/// looking.
#[instrument(skip(initial, user, validator), fields(order, max_difficulty = ?max_difficulty))]
pub fn solve(
    initial: &[u8],
    order: u8,
    max_difficulty: Difficulty,
    user: &UserDeductions<'_>,
    validator: Option<&dyn Fn(&[u8]) -> bool>,
) -> Result<SolveOutcome, LatinError> {
    if order == 0 {
        return Err(LatinError::InvalidOrder(order));
    }
    if order > MAX_ORDER {
        return Err(LatinError::OrderTooLarge(order));
    }
    let o = order as usize;
    if initial.len() != o * o {
        return Err(LatinError::GridLengthMismatch {
            expected: o * o,
            actual: initial.len(),
        });
    }
    for &v in initial {
        if v > order {
            return Err(LatinError::DigitOutOfRange { digit: v, order });
        }
    }

    let mut state = match LatinState::from_clues(initial, order) {
        Ok(s) => s,
        Err(()) => return Ok(SolveOutcome::Impossible),
    };

    let mut count = 0u32;
    let mut first: Option<(Vec<u8>, Difficulty)> = None;
    let mut unfinished = false;
    recurse(
        &mut state,
        max_difficulty,
        user,
        validator,
        Difficulty::Simple,
        &mut count,
        &mut first,
        &mut unfinished,
        2,
    );

    Ok(match count {
        0 if unfinished => SolveOutcome::Unfinished,
        0 => SolveOutcome::Impossible,
        1 => {
            let (grid, difficulty) = first.expect("count == 1 implies a recorded solution");
            SolveOutcome::Solved { grid, difficulty }
        }
        _ => SolveOutcome::Ambiguous,
    })
}
