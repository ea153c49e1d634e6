//! Caret positions as integer text offsets.
//!
//! An offset counts text content from the start of a container in document
//! order; voids count as a single unit. Offsets are only meaningful against
//! the container's current shape and are recomputed after every mutation,
//! never persisted.

use crate::core::{Node, Point};

/// Text length from the start of `children` up to the caret at
/// (`point_path`, `point_offset`), where `point_path` is relative to the
/// container. Paths that do not resolve to a text leaf count the full
/// length of everything before them.
pub fn save(children: &[Node], point_path: &[usize], point_offset: usize) -> usize {
    fn walk(
        children: &[Node],
        target: &[usize],
        offset: usize,
        acc: &mut usize,
    ) -> bool {
        for (ix, node) in children.iter().enumerate() {
            let on_target = target.first() == Some(&ix);
            match node {
                Node::Text(t) => {
                    if on_target && target.len() == 1 {
                        *acc += offset.min(t.text.len());
                        return true;
                    }
                    *acc += t.text.len();
                }
                Node::Void(v) => {
                    if on_target && target.len() == 1 {
                        return true;
                    }
                    *acc += v.caret_len();
                }
                Node::Element(el) => {
                    if on_target {
                        if walk(&el.children, &target[1..], offset, acc) {
                            return true;
                        }
                        return true;
                    }
                    if walk(&el.children, &[], 0, acc) {
                        return true;
                    }
                }
            }
        }
        false
    }

    let mut acc = 0usize;
    walk(children, point_path, point_offset, &mut acc);
    acc
}

/// Place a collapsed caret at the text position where the cumulative text
/// length first reaches `offset`. Offsets past the end clamp to the last
/// text position; this is a total function and never errors.
pub fn restore(children: &[Node], offset: usize) -> Point {
    fn walk(
        children: &[Node],
        path: &mut Vec<usize>,
        remaining: &mut usize,
        last_text: &mut Option<Point>,
    ) -> Option<Point> {
        for (ix, node) in children.iter().enumerate() {
            path.push(ix);
            match node {
                Node::Text(t) => {
                    if *remaining <= t.text.len() {
                        let offset = clamp_to_char_boundary(&t.text, *remaining);
                        let point = Point::new(path.clone(), offset);
                        path.pop();
                        return Some(point);
                    }
                    *remaining -= t.text.len();
                    *last_text = Some(Point::new(path.clone(), t.text.len()));
                }
                Node::Void(v) => {
                    *remaining = remaining.saturating_sub(v.caret_len());
                }
                Node::Element(el) => {
                    if let Some(point) = walk(&el.children, path, remaining, last_text) {
                        path.pop();
                        return Some(point);
                    }
                }
            }
            path.pop();
        }
        None
    }

    let mut remaining = offset;
    let mut last_text = None;
    if let Some(point) = walk(children, &mut Vec::new(), &mut remaining, &mut last_text) {
        return point;
    }
    last_text.unwrap_or_else(|| Point::new(vec![0], 0))
}

/// Total caret-visible length of `children`.
pub fn content_len(children: &[Node]) -> usize {
    let mut total = 0usize;
    for node in children {
        match node {
            Node::Text(t) => total += t.text.len(),
            Node::Void(v) => total += v.caret_len(),
            Node::Element(el) => total += content_len(&el.children),
        }
    }
    total
}

fn clamp_to_char_boundary(s: &str, mut ix: usize) -> usize {
    ix = ix.min(s.len());
    while ix > 0 && !s.is_char_boundary(ix) {
        ix -= 1;
    }
    ix
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::{Attrs, ElementNode, Marks, Node, TextNode};

    fn text(s: &str) -> Node {
        Node::Text(TextNode {
            text: s.to_string(),
            marks: Marks::default(),
        })
    }

    fn para(children: Vec<Node>) -> Node {
        Node::Element(ElementNode {
            kind: "paragraph".to_string(),
            attrs: Attrs::default(),
            children,
        })
    }

    #[test]
    fn save_accumulates_across_siblings() {
        let children = vec![para(vec![text("ab"), text("cd")]), para(vec![text("ef")])];
        assert_eq!(save(&children, &[1, 0], 1), 5);
    }

    #[test]
    fn restore_lands_in_second_leaf() {
        let children = vec![para(vec![text("ab"), text("cd")])];
        let point = restore(&children, 3);
        assert_eq!(point.path, vec![0, 1]);
        assert_eq!(point.offset, 1);
    }

    #[test]
    fn restore_clamps_past_the_end() {
        let children = vec![para(vec![text("ab")])];
        let point = restore(&children, 99);
        assert_eq!(point.path, vec![0, 0]);
        assert_eq!(point.offset, 2);
    }

    #[test]
    fn round_trip_over_nested_tree() {
        let children = vec![
            para(vec![text("one ")]),
            Node::Element(ElementNode {
                kind: "blockquote".to_string(),
                attrs: Attrs::default(),
                children: vec![para(vec![text("two")])],
            }),
        ];
        let saved = save(&children, &[1, 0, 0], 2);
        let point = restore(&children, saved);
        assert_eq!(point.path, vec![1, 0, 0]);
        assert_eq!(point.offset, 2);
    }
}
