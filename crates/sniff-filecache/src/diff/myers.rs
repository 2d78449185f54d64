//! Myers' O(ND) shortest edit script over arbitrary token slices.

/// Beyond this many edits the remaining middle section is reported as a
/// wholesale delete followed by an insert.
const MAX_EDIT_DISTANCE: usize = 1024;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Edit {
    Equal { old: usize, new: usize },
    Delete { old: usize },
    Insert { new: usize },
}

impl Edit {
    #[inline]
    pub(crate) fn is_change(&self) -> bool {
        !matches!(self, Edit::Equal { .. })
    }
}

/// Computes an edit script transforming `old` into `new`. Token indexes in
/// the result refer to positions in the input slices.
pub(crate) fn diff<T: PartialEq>(old: &[T], new: &[T]) -> Vec<Edit> {
    let prefix = old.iter().zip(new).take_while(|(a, b)| a == b).count();
    let suffix = old[prefix..]
        .iter()
        .rev()
        .zip(new[prefix..].iter().rev())
        .take_while(|(a, b)| a == b)
        .count();

    let a = &old[prefix..old.len() - suffix];
    let b = &new[prefix..new.len() - suffix];

    let mut edits = Vec::with_capacity(prefix + suffix + a.len() + b.len());
    edits.extend((0..prefix).map(|i| Edit::Equal { old: i, new: i }));
    edits.extend(middle(a, b).into_iter().map(|edit| shift(edit, prefix)));
    edits.extend((0..suffix).map(|i| Edit::Equal {
        old: prefix + a.len() + i,
        new: prefix + b.len() + i,
    }));
    edits
}

fn shift(edit: Edit, by: usize) -> Edit {
    match edit {
        Edit::Equal { old, new } => Edit::Equal { old: old + by, new: new + by },
        Edit::Delete { old } => Edit::Delete { old: old + by },
        Edit::Insert { new } => Edit::Insert { new: new + by },
    }
}

fn replace_all(n: usize, m: usize) -> Vec<Edit> {
    (0..n)
        .map(|old| Edit::Delete { old })
        .chain((0..m).map(|new| Edit::Insert { new }))
        .collect()
}

fn middle<T: PartialEq>(a: &[T], b: &[T]) -> Vec<Edit> {
    let (n, m) = (a.len(), b.len());
    if n == 0 || m == 0 {
        return replace_all(n, m);
    }

    let max = (n + m).min(MAX_EDIT_DISTANCE) as isize;
    let offset = max + 1;
    let mut v = vec![0usize; 2 * max as usize + 3];
    // trace[d] holds v[-d..=d] as it was before step d
    let mut trace: Vec<Vec<usize>> = Vec::new();

    for d in 0..=max {
        trace.push(v[(offset - d) as usize..=(offset + d) as usize].to_vec());

        for k in (-d..=d).step_by(2) {
            let idx = (offset + k) as usize;
            let mut x = if k == -d || (k != d && v[idx - 1] < v[idx + 1]) {
                v[idx + 1]
            } else {
                v[idx - 1] + 1
            };
            let mut y = (x as isize - k) as usize;
            while x < n && y < m && a[x] == b[y] {
                x += 1;
                y += 1;
            }
            v[idx] = x;

            if x >= n && y >= m {
                return backtrack(&trace, n, m);
            }
        }
    }

    tracing::trace!(n, m, "edit distance exceeds {MAX_EDIT_DISTANCE}, replacing wholesale");
    replace_all(n, m)
}

fn backtrack(trace: &[Vec<usize>], n: usize, m: usize) -> Vec<Edit> {
    let mut edits = Vec::new();
    let (mut x, mut y) = (n, m);

    for d in (1..trace.len()).rev() {
        let v = &trace[d];
        let d = d as isize;
        let at = |k: isize| v[(k + d) as usize];

        let k = x as isize - y as isize;
        let prev_k = if k == -d || (k != d && at(k - 1) < at(k + 1)) {
            k + 1
        } else {
            k - 1
        };
        let prev_x = at(prev_k);
        let prev_y = (prev_x as isize - prev_k) as usize;

        while x > prev_x && y > prev_y {
            x -= 1;
            y -= 1;
            edits.push(Edit::Equal { old: x, new: y });
        }
        if x == prev_x {
            y -= 1;
            edits.push(Edit::Insert { new: y });
        } else {
            x -= 1;
            edits.push(Edit::Delete { old: x });
        }
    }

    while x > 0 && y > 0 {
        x -= 1;
        y -= 1;
        edits.push(Edit::Equal { old: x, new: y });
    }

    edits.reverse();
    edits
}
