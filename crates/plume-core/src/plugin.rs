use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::caret;
use crate::core::{
    Attrs, Document, ElementNode, Marks, Node, Point, Selection, TextNode, MAX_INDENT_LEVEL,
};
use crate::ops::{Op, Path, Transaction};

#[derive(Debug, Clone)]
pub struct CommandError {
    message: String,
}

impl CommandError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }

    pub fn message(&self) -> &str {
        &self.message
    }
}

#[derive(Debug, Clone)]
pub struct QueryError {
    message: String,
}

impl QueryError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }

    pub fn message(&self) -> &str {
        &self.message
    }
}

#[derive(Clone)]
pub struct CommandSpec {
    pub id: String,
    pub label: String,
    pub description: Option<String>,
    pub keywords: Vec<String>,
    pub args_example: Option<serde_json::Value>,
    pub handler: std::sync::Arc<
        dyn Fn(&mut crate::core::Editor, Option<serde_json::Value>) -> Result<(), CommandError>
            + Send
            + Sync,
    >,
}

impl CommandSpec {
    pub fn new(
        id: impl Into<String>,
        label: impl Into<String>,
        handler: impl Fn(
            &mut crate::core::Editor,
            Option<serde_json::Value>,
        ) -> Result<(), CommandError>
        + Send
        + Sync
        + 'static,
    ) -> Self {
        Self {
            id: id.into(),
            label: label.into(),
            description: None,
            keywords: Vec::new(),
            args_example: None,
            handler: std::sync::Arc::new(handler),
        }
    }

    pub fn description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    pub fn keywords<I, S>(mut self, keywords: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.keywords = keywords.into_iter().map(Into::into).collect();
        self
    }

    pub fn args_example(mut self, args_example: serde_json::Value) -> Self {
        self.args_example = Some(args_example);
        self
    }
}

#[derive(Clone)]
pub struct QuerySpec {
    pub id: String,
    pub handler: std::sync::Arc<
        dyn Fn(
                &crate::core::Editor,
                Option<serde_json::Value>,
            ) -> Result<serde_json::Value, QueryError>
            + Send
            + Sync,
    >,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum NodeRole {
    Block,
    Inline,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum ChildConstraint {
    None,
    BlockOnly,
    InlineOnly,
    Any,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NodeSpec {
    pub kind: String,
    pub role: NodeRole,
    pub is_void: bool,
    pub children: ChildConstraint,
}

pub trait NormalizePass: Send + Sync {
    fn id(&self) -> &'static str;
    fn run(&self, doc: &Document, registry: &PluginRegistry) -> Vec<Op>;
}

#[derive(Debug, Clone)]
pub struct TransactionPreview {
    pub doc: Document,
    pub selection: Selection,
}

pub trait TransactionTransform: Send + Sync {
    fn id(&self) -> &'static str;
    fn transform(&self, editor: &crate::core::Editor, tx: &Transaction) -> Option<Transaction>;
}

pub trait PlumePlugin: Send + Sync {
    fn id(&self) -> &'static str;
    fn node_specs(&self) -> Vec<NodeSpec> {
        Vec::new()
    }
    fn transaction_transforms(&self) -> Vec<Box<dyn TransactionTransform>> {
        Vec::new()
    }
    fn normalize_passes(&self) -> Vec<Box<dyn NormalizePass>> {
        Vec::new()
    }
    fn commands(&self) -> Vec<CommandSpec> {
        Vec::new()
    }
    fn queries(&self) -> Vec<QuerySpec> {
        Vec::new()
    }
}

#[derive(Default)]
pub struct PluginRegistry {
    node_specs: HashMap<String, NodeSpec>,
    transaction_transforms: Vec<Box<dyn TransactionTransform>>,
    normalize_passes: Vec<Box<dyn NormalizePass>>,
    commands: HashMap<String, CommandSpec>,
    queries: HashMap<String, QuerySpec>,
}

impl PluginRegistry {
    pub fn new(plugins: impl IntoIterator<Item = Box<dyn PlumePlugin>>) -> Result<Self, String> {
        let mut registry = Self::default();
        for plugin in plugins {
            registry.register_plugin(plugin)?;
        }
        Ok(registry)
    }

    pub fn core() -> Self {
        let plugins: Vec<Box<dyn PlumePlugin>> = vec![
            Box::new(CoreParagraphPlugin),
            Box::new(CoreNormalizePlugin),
        ];
        Self::new(plugins).expect("core registry must be valid")
    }

    /// The full authoring surface: every block and widget kind the
    /// shorthand grammar can produce, plus the shorthand recognizers.
    pub fn authoring() -> Self {
        let plugins: Vec<Box<dyn PlumePlugin>> = vec![
            Box::new(CoreParagraphPlugin),
            Box::new(CoreNormalizePlugin),
            Box::new(crate::autoformat::AutoformatPlugin),
            Box::new(HeadingPlugin),
            Box::new(BlockquotePlugin),
            Box::new(PreLinePlugin),
            Box::new(crate::list::ListPlugin),
            Box::new(CodeBlockPlugin),
            Box::new(CalloutPlugin),
            Box::new(MathPlugin),
            Box::new(IndentPlugin),
            Box::new(AlignPlugin),
        ];
        Self::new(plugins).expect("authoring registry must be valid")
    }

    pub fn register_plugin(&mut self, plugin: Box<dyn PlumePlugin>) -> Result<(), String> {
        for spec in plugin.node_specs() {
            if self.node_specs.contains_key(&spec.kind) {
                return Err(format!("Duplicate node spec kind: {}", spec.kind));
            }
            self.node_specs.insert(spec.kind.clone(), spec);
        }

        self.transaction_transforms
            .extend(plugin.transaction_transforms());

        self.normalize_passes.extend(plugin.normalize_passes());

        for cmd in plugin.commands() {
            if self.commands.contains_key(&cmd.id) {
                return Err(format!("Duplicate command id: {}", cmd.id));
            }
            self.commands.insert(cmd.id.clone(), cmd);
        }

        for query in plugin.queries() {
            if self.queries.contains_key(&query.id) {
                return Err(format!("Duplicate query id: {}", query.id));
            }
            self.queries.insert(query.id.clone(), query);
        }

        Ok(())
    }

    pub fn node_specs(&self) -> &HashMap<String, NodeSpec> {
        &self.node_specs
    }

    pub fn transaction_transforms(&self) -> &[Box<dyn TransactionTransform>] {
        &self.transaction_transforms
    }

    pub fn normalize_passes(&self) -> &[Box<dyn NormalizePass>] {
        &self.normalize_passes
    }

    pub fn commands(&self) -> &HashMap<String, CommandSpec> {
        &self.commands
    }

    pub fn command(&self, id: &str) -> Option<CommandSpec> {
        self.commands.get(id).cloned()
    }

    pub fn queries(&self) -> &HashMap<String, QuerySpec> {
        &self.queries
    }

    pub fn query(&self, id: &str) -> Option<QuerySpec> {
        self.queries.get(id).cloned()
    }

    pub fn normalize(&self, doc: &Document) -> Vec<Op> {
        let mut ops: Vec<Op> = Vec::new();
        for pass in &self.normalize_passes {
            ops.extend(pass.run(doc, self));
        }
        ops
    }

    pub fn normalize_selection(&self, doc: &Document, selection: &Selection) -> Selection {
        let fallback = first_text_point(doc).unwrap_or(Point {
            path: vec![0],
            offset: 0,
        });

        let anchor =
            normalize_point_to_existing_text(doc, &selection.anchor).unwrap_or_else(|| {
                normalize_point_to_existing_text(doc, &selection.focus)
                    .unwrap_or_else(|| fallback.clone())
            });
        let focus = normalize_point_to_existing_text(doc, &selection.focus)
            .unwrap_or_else(|| anchor.clone());

        Selection { anchor, focus }
    }

    pub fn is_known_kind(&self, kind: &str) -> bool {
        self.node_specs.contains_key(kind)
    }

    pub fn child_constraint(&self, kind: &str) -> ChildConstraint {
        self.node_specs
            .get(kind)
            .map(|s| s.children.clone())
            .unwrap_or(ChildConstraint::Any)
    }
}

fn first_text_point(doc: &Document) -> Option<Point> {
    fn walk(children: &[Node], path: &mut Vec<usize>) -> Option<Point> {
        for (ix, node) in children.iter().enumerate() {
            path.push(ix);
            match node {
                Node::Text(_) => {
                    let point = Point {
                        path: path.clone(),
                        offset: 0,
                    };
                    path.pop();
                    return Some(point);
                }
                Node::Element(el) => {
                    if let Some(point) = walk(&el.children, path) {
                        path.pop();
                        return Some(point);
                    }
                }
                Node::Void(_) => {}
            }
            path.pop();
        }
        None
    }

    walk(&doc.children, &mut Vec::new())
}

fn normalize_point_to_existing_text(doc: &Document, point: &Point) -> Option<Point> {
    if point.path.is_empty() || doc.children.is_empty() {
        return None;
    }

    fn first_text_descendant(children: &[Node], path: &mut Vec<usize>) -> Option<Point> {
        for (ix, node) in children.iter().enumerate() {
            path.push(ix);
            match node {
                Node::Text(_) => {
                    let point = Point {
                        path: path.clone(),
                        offset: 0,
                    };
                    path.pop();
                    return Some(point);
                }
                Node::Element(el) => {
                    if let Some(point) = first_text_descendant(&el.children, path) {
                        path.pop();
                        return Some(point);
                    }
                }
                Node::Void(_) => {}
            }
            path.pop();
        }
        None
    }

    let mut resolved_path: Vec<usize> = Vec::new();
    let mut children: &[Node] = &doc.children;

    for &wanted in &point.path {
        if children.is_empty() {
            break;
        }
        let ix = wanted.min(children.len() - 1);
        resolved_path.push(ix);
        let node = &children[ix];
        match node {
            Node::Text(t) => {
                return Some(Point {
                    path: resolved_path,
                    offset: point.offset.min(t.text.len()),
                });
            }
            Node::Element(el) => {
                children = &el.children;
            }
            Node::Void(_) => {
                break;
            }
        }
    }

    let node = node_at_path(doc, &resolved_path)?;
    match node {
        Node::Text(t) => Some(Point {
            path: resolved_path,
            offset: point.offset.min(t.text.len()),
        }),
        Node::Element(el) => first_text_descendant(&el.children, &mut resolved_path),
        Node::Void(_) => None,
    }
}

pub(crate) fn node_at_path<'a>(doc: &'a Document, path: &[usize]) -> Option<&'a Node> {
    if path.is_empty() {
        return None;
    }

    let mut node = doc.children.get(path[0])?;
    for &ix in path.iter().skip(1) {
        node = match node {
            Node::Element(el) => el.children.get(ix)?,
            Node::Void(_) | Node::Text(_) => return None,
        };
    }
    Some(node)
}

/// Global text offset of (`child_ix`, `offset`) within a flat inline list.
pub(crate) fn point_global_offset(children: &[Node], child_ix: usize, offset: usize) -> usize {
    caret::save(children, &[child_ix], offset)
}

/// Point under `base_path` whose cumulative text length reaches `global`.
pub(crate) fn point_for_global_offset(
    base_path: &[usize],
    children: &[Node],
    global: usize,
) -> Point {
    let relative = caret::restore(children, global);
    let mut path = base_path.to_vec();
    path.extend(relative.path);
    Point::new(path, relative.offset)
}

pub(crate) fn element_is_text_block(el: &ElementNode, registry: &PluginRegistry) -> bool {
    registry.child_constraint(&el.kind) == ChildConstraint::InlineOnly
}

/// Ops replacing the node at `path` with `node`.
pub(crate) fn replace_node_ops(path: &[usize], node: Node) -> Vec<Op> {
    vec![
        Op::RemoveNode {
            path: path.to_vec(),
        },
        Op::InsertNode {
            path: path.to_vec(),
            node,
        },
    ]
}

struct CoreParagraphPlugin;

impl PlumePlugin for CoreParagraphPlugin {
    fn id(&self) -> &'static str {
        "core.paragraph"
    }

    fn node_specs(&self) -> Vec<NodeSpec> {
        vec![NodeSpec {
            kind: "paragraph".to_string(),
            role: NodeRole::Block,
            is_void: false,
            children: ChildConstraint::InlineOnly,
        }]
    }
}

struct PreLinePlugin;

impl PlumePlugin for PreLinePlugin {
    fn id(&self) -> &'static str {
        "pre_line"
    }

    fn node_specs(&self) -> Vec<NodeSpec> {
        vec![NodeSpec {
            kind: "pre_line".to_string(),
            role: NodeRole::Block,
            is_void: false,
            children: ChildConstraint::InlineOnly,
        }]
    }
}

struct CoreNormalizePlugin;

impl PlumePlugin for CoreNormalizePlugin {
    fn id(&self) -> &'static str {
        "core.normalize"
    }

    fn normalize_passes(&self) -> Vec<Box<dyn NormalizePass>> {
        vec![
            Box::new(EnsureNonEmptyDocument),
            Box::new(EnsureInlineBlocksHaveTextLeaf),
            Box::new(MergeAdjacentTextLeaves),
        ]
    }
}

struct EnsureNonEmptyDocument;

impl NormalizePass for EnsureNonEmptyDocument {
    fn id(&self) -> &'static str {
        "core.ensure_non_empty_document"
    }

    fn run(&self, doc: &Document, _registry: &PluginRegistry) -> Vec<Op> {
        if doc.children.is_empty() {
            return vec![Op::InsertNode {
                path: vec![0],
                node: Node::paragraph(""),
            }];
        }
        Vec::new()
    }
}

struct EnsureInlineBlocksHaveTextLeaf;

impl NormalizePass for EnsureInlineBlocksHaveTextLeaf {
    fn id(&self) -> &'static str {
        "core.ensure_inline_only_blocks_have_text_leaf"
    }

    fn run(&self, doc: &Document, registry: &PluginRegistry) -> Vec<Op> {
        let mut ops = Vec::new();

        fn walk(
            children: &[Node],
            path: &mut Vec<usize>,
            registry: &PluginRegistry,
            ops: &mut Vec<Op>,
        ) {
            for (ix, node) in children.iter().enumerate() {
                let Node::Element(el) = node else {
                    continue;
                };

                path.push(ix);

                if registry.child_constraint(&el.kind) == ChildConstraint::InlineOnly {
                    let has_text = el.children.iter().any(|n| matches!(n, Node::Text(_)));
                    if !has_text {
                        let mut insert_path = path.clone();
                        insert_path.push(0);
                        ops.push(Op::InsertNode {
                            path: insert_path,
                            node: Node::Text(TextNode {
                                text: String::new(),
                                marks: Marks::default(),
                            }),
                        });
                    }
                } else {
                    walk(&el.children, path, registry, ops);
                }

                path.pop();
            }
        }

        walk(&doc.children, &mut Vec::new(), registry, &mut ops);
        ops
    }
}

struct MergeAdjacentTextLeaves;

impl NormalizePass for MergeAdjacentTextLeaves {
    fn id(&self) -> &'static str {
        "core.merge_adjacent_text_leaves"
    }

    fn run(&self, doc: &Document, registry: &PluginRegistry) -> Vec<Op> {
        let mut ops = Vec::new();

        fn walk(
            children: &[Node],
            path: &mut Vec<usize>,
            registry: &PluginRegistry,
            ops: &mut Vec<Op>,
        ) {
            for (ix, node) in children.iter().enumerate() {
                let Node::Element(el) = node else {
                    continue;
                };

                path.push(ix);

                let constraint = match registry.node_specs().get(&el.kind) {
                    Some(spec) => spec.children.clone(),
                    None if el.children.iter().any(|n| matches!(n, Node::Text(_))) => {
                        ChildConstraint::InlineOnly
                    }
                    None => ChildConstraint::Any,
                };

                if constraint == ChildConstraint::InlineOnly {
                    if el.children.len() >= 2 {
                        let mut ix = el.children.len();
                        while ix > 0 {
                            ix -= 1;
                            let Node::Text(right) = &el.children[ix] else {
                                continue;
                            };

                            let mut start = ix;
                            while start > 0 {
                                let Some(Node::Text(left)) = el.children.get(start - 1) else {
                                    break;
                                };
                                if left.marks != right.marks {
                                    break;
                                }
                                start -= 1;
                            }

                            if start == ix {
                                continue;
                            }

                            let Some(Node::Text(first)) = el.children.get(start) else {
                                continue;
                            };
                            let mut appended = String::new();
                            for node in el.children.iter().take(ix + 1).skip(start + 1) {
                                if let Node::Text(t) = node {
                                    appended.push_str(&t.text);
                                }
                            }

                            if !appended.is_empty() {
                                let mut insert_text_path = path.clone();
                                insert_text_path.push(start);
                                ops.push(Op::InsertText {
                                    path: insert_text_path,
                                    offset: first.text.len(),
                                    text: appended,
                                });
                            }

                            for remove_ix in (start + 1..=ix).rev() {
                                let mut remove_path = path.clone();
                                remove_path.push(remove_ix);
                                ops.push(Op::RemoveNode { path: remove_path });
                            }

                            ix = start;
                        }
                    }
                } else {
                    walk(&el.children, path, registry, ops);
                }

                path.pop();
            }
        }

        walk(&doc.children, &mut Vec::new(), registry, &mut ops);

        ops
    }
}

struct HeadingPlugin;

impl PlumePlugin for HeadingPlugin {
    fn id(&self) -> &'static str {
        "heading"
    }

    fn node_specs(&self) -> Vec<NodeSpec> {
        vec![NodeSpec {
            kind: "heading".to_string(),
            role: NodeRole::Block,
            is_void: false,
            children: ChildConstraint::InlineOnly,
        }]
    }

    fn normalize_passes(&self) -> Vec<Box<dyn NormalizePass>> {
        vec![Box::new(NormalizeHeadingLevels)]
    }

    fn commands(&self) -> Vec<CommandSpec> {
        vec![
            CommandSpec::new("block.set_heading", "Set heading", |editor, args| {
                let level = args
                    .as_ref()
                    .and_then(|v| v.get("level"))
                    .and_then(|v| v.as_u64())
                    .unwrap_or(1)
                    .clamp(1, 4);
                let tx = convert_focus_block(editor, "heading", |attrs| {
                    attrs.insert(
                        "level".to_string(),
                        Value::Number(serde_json::Number::from(level)),
                    );
                })
                .map_err(CommandError::new)?;
                apply_or_noop(editor, tx)
            })
            .description("Convert the active text block into a heading.")
            .keywords(["heading", "title", "h1", "h2", "h3", "h4"])
            .args_example(serde_json::json!({ "level": 2 })),
            CommandSpec::new("block.unset_heading", "Unset heading", |editor, _args| {
                let tx = convert_focus_block(editor, "paragraph", |attrs| {
                    attrs.remove("level");
                })
                .map_err(CommandError::new)?;
                apply_or_noop(editor, tx)
            })
            .description("Convert heading back to a paragraph.")
            .keywords(["heading", "paragraph", "reset"]),
        ]
    }

    fn queries(&self) -> Vec<QuerySpec> {
        vec![QuerySpec {
            id: "block.heading_level".to_string(),
            handler: std::sync::Arc::new(|editor, _args| {
                let Some(el) = focus_block(editor) else {
                    return Ok(Value::Null);
                };
                if el.kind != "heading" {
                    return Ok(Value::Null);
                }
                Ok(el
                    .attrs
                    .get("level")
                    .cloned()
                    .unwrap_or(Value::Number(1u64.into())))
            }),
        }]
    }
}

struct NormalizeHeadingLevels;

impl NormalizePass for NormalizeHeadingLevels {
    fn id(&self) -> &'static str {
        "heading.normalize_levels"
    }

    fn run(&self, doc: &Document, registry: &PluginRegistry) -> Vec<Op> {
        let mut ops = Vec::new();
        walk_elements(doc, registry, &mut |el, path| {
            if el.kind != "heading" {
                return;
            }
            let level = el.attr_u64("level").unwrap_or(1).clamp(1, 4);
            if el.attr_u64("level") != Some(level) {
                let mut set = Attrs::default();
                set.insert(
                    "level".to_string(),
                    Value::Number(serde_json::Number::from(level)),
                );
                ops.push(Op::SetNodeAttrs {
                    path: path.to_vec(),
                    patch: crate::core::AttrPatch {
                        set,
                        remove: Vec::new(),
                    },
                });
            }
        });
        ops
    }
}

struct BlockquotePlugin;

impl PlumePlugin for BlockquotePlugin {
    fn id(&self) -> &'static str {
        "blockquote"
    }

    fn node_specs(&self) -> Vec<NodeSpec> {
        vec![NodeSpec {
            kind: "blockquote".to_string(),
            role: NodeRole::Block,
            is_void: false,
            children: ChildConstraint::BlockOnly,
        }]
    }

    fn normalize_passes(&self) -> Vec<Box<dyn NormalizePass>> {
        vec![Box::new(NormalizeBlockquoteChildren)]
    }
}

struct NormalizeBlockquoteChildren;

impl NormalizePass for NormalizeBlockquoteChildren {
    fn id(&self) -> &'static str {
        "blockquote.normalize_children"
    }

    fn run(&self, doc: &Document, registry: &PluginRegistry) -> Vec<Op> {
        let mut ops = Vec::new();
        walk_elements(doc, registry, &mut |el, path| {
            if el.kind != "blockquote" {
                return;
            }
            if el.children.is_empty() {
                let mut insert_path = path.to_vec();
                insert_path.push(0);
                ops.push(Op::InsertNode {
                    path: insert_path,
                    node: Node::paragraph(""),
                });
                return;
            }
            // Loose inline leaves get wrapped into a paragraph.
            for (ix, child) in el.children.iter().enumerate() {
                if let Node::Text(t) = child {
                    let mut child_path = path.to_vec();
                    child_path.push(ix);
                    ops.push(Op::RemoveNode {
                        path: child_path.clone(),
                    });
                    ops.push(Op::InsertNode {
                        path: child_path,
                        node: Node::paragraph(t.text.clone()),
                    });
                    return;
                }
            }
        });
        ops
    }
}

struct CodeBlockPlugin;

impl PlumePlugin for CodeBlockPlugin {
    fn id(&self) -> &'static str {
        "code_block"
    }

    fn node_specs(&self) -> Vec<NodeSpec> {
        vec![NodeSpec {
            kind: "code_block".to_string(),
            role: NodeRole::Block,
            is_void: false,
            children: ChildConstraint::InlineOnly,
        }]
    }

    fn commands(&self) -> Vec<CommandSpec> {
        vec![
            CommandSpec::new("code_block.insert", "Insert code block", |editor, args| {
                let language = args
                    .as_ref()
                    .and_then(|v| v.get("language"))
                    .and_then(|v| v.as_str())
                    .filter(|s| !s.is_empty())
                    .unwrap_or("text")
                    .to_string();
                let tx = convert_focus_block(editor, "code_block", |attrs| {
                    attrs.clear();
                    attrs.insert("language".to_string(), Value::String(language.clone()));
                })
                .map_err(CommandError::new)?;
                apply_or_noop(editor, tx)
            })
            .description("Turn the active block into a code block.")
            .keywords(["code", "fence", "monospace"])
            .args_example(serde_json::json!({ "language": "js" })),
        ]
    }

    fn queries(&self) -> Vec<QuerySpec> {
        vec![QuerySpec {
            id: "code_block.is_active".to_string(),
            handler: std::sync::Arc::new(|editor, _args| {
                Ok(Value::Bool(
                    focus_block(editor).is_some_and(|el| el.kind == "code_block"),
                ))
            }),
        }]
    }
}

pub const CALLOUT_KINDS: [&str; 12] = [
    "note", "abstract", "info", "tip", "success", "question", "warning", "failure", "danger",
    "bug", "example", "quote",
];

pub fn is_callout_kind(kind: &str) -> bool {
    CALLOUT_KINDS.contains(&kind)
}

/// A callout element with `kind`/`folded` attrs, a title row and a body.
pub fn callout_node(kind: &str, title: &str, body: Vec<Node>) -> Node {
    let mut attrs = Attrs::default();
    attrs.insert("kind".to_string(), Value::String(kind.to_string()));
    attrs.insert("folded".to_string(), Value::Bool(false));
    let body = if body.is_empty() {
        vec![Node::paragraph("")]
    } else {
        body
    };
    Node::Element(ElementNode {
        kind: "callout".to_string(),
        attrs,
        children: vec![
            Node::Element(ElementNode {
                kind: "callout_title".to_string(),
                attrs: Attrs::default(),
                children: vec![Node::text(title, Marks::default())],
            }),
            Node::Element(ElementNode {
                kind: "callout_body".to_string(),
                attrs: Attrs::default(),
                children: body,
            }),
        ],
    })
}

struct CalloutPlugin;

impl PlumePlugin for CalloutPlugin {
    fn id(&self) -> &'static str {
        "callout"
    }

    fn node_specs(&self) -> Vec<NodeSpec> {
        vec![
            NodeSpec {
                kind: "callout".to_string(),
                role: NodeRole::Block,
                is_void: false,
                children: ChildConstraint::BlockOnly,
            },
            NodeSpec {
                kind: "callout_title".to_string(),
                role: NodeRole::Block,
                is_void: false,
                children: ChildConstraint::InlineOnly,
            },
            NodeSpec {
                kind: "callout_body".to_string(),
                role: NodeRole::Block,
                is_void: false,
                children: ChildConstraint::BlockOnly,
            },
        ]
    }

    fn normalize_passes(&self) -> Vec<Box<dyn NormalizePass>> {
        vec![Box::new(NormalizeCalloutStructure)]
    }

    fn commands(&self) -> Vec<CommandSpec> {
        vec![
            CommandSpec::new("callout.insert", "Insert callout", |editor, args| {
                let kind = args
                    .as_ref()
                    .and_then(|v| v.get("kind"))
                    .and_then(|v| v.as_str())
                    .filter(|k| is_callout_kind(k))
                    .unwrap_or("note")
                    .to_string();
                let Some(block_path) = focus_block_path(editor) else {
                    return Err(CommandError::new("No active block"));
                };
                let node = callout_node(&kind, "", Vec::new());
                let mut title_text_path = block_path.clone();
                title_text_path.extend([0, 0]);
                let tx = Transaction::new(replace_node_ops(&block_path, node))
                    .selection_after(Selection::collapsed(Point::new(title_text_path, 0)));
                apply_or_noop(editor, tx)
            })
            .description("Replace the active block with a callout box.")
            .keywords(["callout", "note", "admonition", "box"])
            .args_example(serde_json::json!({ "kind": "warning" })),
        ]
    }

    fn queries(&self) -> Vec<QuerySpec> {
        vec![QuerySpec {
            id: "callout.active_kind".to_string(),
            handler: std::sync::Arc::new(|editor, _args| {
                let path = &editor.selection().focus.path;
                for depth in (1..path.len()).rev() {
                    if let Some(Node::Element(el)) = node_at_path(editor.doc(), &path[..depth]) {
                        if el.kind == "callout" {
                            return Ok(el
                                .attrs
                                .get("kind")
                                .cloned()
                                .unwrap_or(Value::String("note".to_string())));
                        }
                    }
                }
                Ok(Value::Null)
            }),
        }]
    }
}

struct NormalizeCalloutStructure;

impl NormalizePass for NormalizeCalloutStructure {
    fn id(&self) -> &'static str {
        "callout.normalize_structure"
    }

    fn run(&self, doc: &Document, registry: &PluginRegistry) -> Vec<Op> {
        let mut ops = Vec::new();
        walk_elements(doc, registry, &mut |el, path| {
            if el.kind != "callout" {
                return;
            }

            if !el
                .attr_str("kind")
                .is_some_and(is_callout_kind)
            {
                let mut set = Attrs::default();
                set.insert("kind".to_string(), Value::String("note".to_string()));
                ops.push(Op::SetNodeAttrs {
                    path: path.to_vec(),
                    patch: crate::core::AttrPatch {
                        set,
                        remove: Vec::new(),
                    },
                });
            }

            let title_ok = matches!(
                el.children.first(),
                Some(Node::Element(first)) if first.kind == "callout_title"
            );
            if !title_ok {
                let mut insert_path = path.to_vec();
                insert_path.push(0);
                ops.push(Op::InsertNode {
                    path: insert_path,
                    node: Node::Element(ElementNode {
                        kind: "callout_title".to_string(),
                        attrs: Attrs::default(),
                        children: vec![Node::text("", Marks::default())],
                    }),
                });
                return;
            }

            let body_ok = matches!(
                el.children.get(1),
                Some(Node::Element(second)) if second.kind == "callout_body"
            );
            if !body_ok {
                let mut insert_path = path.to_vec();
                insert_path.push(1);
                ops.push(Op::InsertNode {
                    path: insert_path,
                    node: Node::Element(ElementNode {
                        kind: "callout_body".to_string(),
                        attrs: Attrs::default(),
                        children: vec![Node::paragraph("")],
                    }),
                });
            }
        });
        ops
    }
}

struct MathPlugin;

impl PlumePlugin for MathPlugin {
    fn id(&self) -> &'static str {
        "math"
    }

    fn node_specs(&self) -> Vec<NodeSpec> {
        vec![
            NodeSpec {
                kind: "math".to_string(),
                role: NodeRole::Inline,
                is_void: true,
                children: ChildConstraint::None,
            },
            NodeSpec {
                kind: "math_display".to_string(),
                role: NodeRole::Block,
                is_void: true,
                children: ChildConstraint::None,
            },
        ]
    }

    fn normalize_passes(&self) -> Vec<Box<dyn NormalizePass>> {
        vec![Box::new(NormalizeMathStatus)]
    }

    fn commands(&self) -> Vec<CommandSpec> {
        vec![
            CommandSpec::new(
                "math.insert_display",
                "Insert display math",
                |editor, args| {
                    let expression = args
                        .as_ref()
                        .and_then(|v| v.get("expression"))
                        .and_then(|v| v.as_str())
                        .unwrap_or("")
                        .to_string();
                    let Some(block_path) = focus_block_path(editor) else {
                        return Err(CommandError::new("No active block"));
                    };
                    let mut after_path = block_path.clone();
                    *after_path.last_mut().unwrap() += 1;
                    let mut caret_path = after_path.clone();
                    caret_path.push(0);
                    let mut ops = replace_node_ops(&block_path, Node::math_span(expression, true));
                    ops.push(Op::InsertNode {
                        path: after_path,
                        node: Node::paragraph(""),
                    });
                    let tx = Transaction::new(ops)
                        .selection_after(Selection::collapsed(Point::new(caret_path, 0)));
                    apply_or_noop(editor, tx)
                },
            )
            .description("Replace the active block with a display math block.")
            .keywords(["math", "equation", "formula"])
            .args_example(serde_json::json!({ "expression": "x^2" })),
        ]
    }
}

struct NormalizeMathStatus;

impl NormalizePass for NormalizeMathStatus {
    fn id(&self) -> &'static str {
        "math.normalize_status"
    }

    fn run(&self, doc: &Document, _registry: &PluginRegistry) -> Vec<Op> {
        let mut ops = Vec::new();

        fn walk(children: &[Node], path: &mut Vec<usize>, ops: &mut Vec<Op>) {
            for (ix, node) in children.iter().enumerate() {
                path.push(ix);
                match node {
                    Node::Void(v) if v.kind == "math" || v.kind == "math_display" => {
                        let status = v.attrs.get("status").and_then(|s| s.as_str());
                        if !matches!(status, Some("pending") | Some("done")) {
                            let mut set = Attrs::default();
                            set.insert(
                                "status".to_string(),
                                Value::String("pending".to_string()),
                            );
                            ops.push(Op::SetNodeAttrs {
                                path: path.clone(),
                                patch: crate::core::AttrPatch {
                                    set,
                                    remove: Vec::new(),
                                },
                            });
                        }
                    }
                    Node::Element(el) => walk(&el.children, path, ops),
                    _ => {}
                }
                path.pop();
            }
        }

        walk(&doc.children, &mut Vec::new(), &mut ops);
        ops
    }
}

struct IndentPlugin;

impl PlumePlugin for IndentPlugin {
    fn id(&self) -> &'static str {
        "indent"
    }

    fn normalize_passes(&self) -> Vec<Box<dyn NormalizePass>> {
        vec![Box::new(ClampIndentLevels)]
    }

    fn commands(&self) -> Vec<CommandSpec> {
        vec![
            CommandSpec::new("block.adjust_indent", "Adjust indent", |editor, args| {
                let delta = args
                    .as_ref()
                    .and_then(|v| v.get("delta"))
                    .and_then(|v| v.as_i64())
                    .unwrap_or(1);
                let tx = adjust_indent(editor, delta);
                apply_or_noop(editor, tx)
            })
            .description("Indent or outdent every top-level block in the selection.")
            .keywords(["indent", "outdent", "tab"])
            .args_example(serde_json::json!({ "delta": -1 })),
        ]
    }

    fn queries(&self) -> Vec<QuerySpec> {
        vec![QuerySpec {
            id: "block.indent_level".to_string(),
            handler: std::sync::Arc::new(|editor, _args| {
                let ix = *editor.selection().focus.path.first().unwrap_or(&0);
                let level = match editor.doc().children.get(ix) {
                    Some(Node::Element(el)) => el.attr_u64("indent").unwrap_or(0),
                    _ => 0,
                };
                Ok(Value::Number(serde_json::Number::from(level)))
            }),
        }]
    }
}

struct ClampIndentLevels;

impl NormalizePass for ClampIndentLevels {
    fn id(&self) -> &'static str {
        "indent.clamp_levels"
    }

    fn run(&self, doc: &Document, _registry: &PluginRegistry) -> Vec<Op> {
        let mut ops = Vec::new();
        for (ix, node) in doc.children.iter().enumerate() {
            let Node::Element(el) = node else {
                continue;
            };
            let Some(raw) = el.attrs.get("indent") else {
                continue;
            };
            let level = raw.as_u64().unwrap_or(0).min(MAX_INDENT_LEVEL);
            if level == 0 {
                ops.push(Op::SetNodeAttrs {
                    path: vec![ix],
                    patch: crate::core::AttrPatch {
                        set: Attrs::default(),
                        remove: vec!["indent".to_string()],
                    },
                });
            } else if raw.as_u64() != Some(level) {
                let mut set = Attrs::default();
                set.insert(
                    "indent".to_string(),
                    Value::Number(serde_json::Number::from(level)),
                );
                ops.push(Op::SetNodeAttrs {
                    path: vec![ix],
                    patch: crate::core::AttrPatch {
                        set,
                        remove: Vec::new(),
                    },
                });
            }
        }
        ops
    }
}

/// Indent adjustment is independent of block kind: every top-level block
/// the selection touches moves by `delta`, clamped to [0, 8].
pub fn adjust_indent(editor: &crate::core::Editor, delta: i64) -> Transaction {
    let selection = editor.selection();
    let a = *selection.anchor.path.first().unwrap_or(&0);
    let b = *selection.focus.path.first().unwrap_or(&0);
    let (start, end) = if a <= b { (a, b) } else { (b, a) };

    let mut ops = Vec::new();
    for ix in start..=end.min(editor.doc().children.len().saturating_sub(1)) {
        let Some(Node::Element(el)) = editor.doc().children.get(ix) else {
            continue;
        };
        let current = el.attr_u64("indent").unwrap_or(0) as i64;
        let next = (current + delta).clamp(0, MAX_INDENT_LEVEL as i64) as u64;
        if next == current as u64 {
            continue;
        }
        let mut set = Attrs::default();
        let mut remove = Vec::new();
        if next == 0 {
            remove.push("indent".to_string());
        } else {
            set.insert(
                "indent".to_string(),
                Value::Number(serde_json::Number::from(next)),
            );
        }
        ops.push(Op::SetNodeAttrs {
            path: vec![ix],
            patch: crate::core::AttrPatch { set, remove },
        });
    }
    Transaction::new(ops)
}

struct AlignPlugin;

impl PlumePlugin for AlignPlugin {
    fn id(&self) -> &'static str {
        "align"
    }

    fn normalize_passes(&self) -> Vec<Box<dyn NormalizePass>> {
        vec![Box::new(NormalizeAlignAttrs)]
    }

    fn commands(&self) -> Vec<CommandSpec> {
        vec![
            CommandSpec::new("block.set_align", "Set alignment", |editor, args| {
                let align = args
                    .as_ref()
                    .and_then(|v| v.get("align"))
                    .and_then(|v| v.as_str())
                    .unwrap_or("left")
                    .to_string();
                if !matches!(align.as_str(), "left" | "center" | "right") {
                    return Err(CommandError::new(format!("Unknown alignment: {align}")));
                }
                let Some(block_path) = focus_block_path(editor) else {
                    return Err(CommandError::new("No active block"));
                };
                let mut set = Attrs::default();
                let mut remove = Vec::new();
                if align == "left" {
                    remove.push("align".to_string());
                } else {
                    set.insert("align".to_string(), Value::String(align));
                }
                let tx = Transaction::new(vec![Op::SetNodeAttrs {
                    path: block_path,
                    patch: crate::core::AttrPatch { set, remove },
                }]);
                apply_or_noop(editor, tx)
            })
            .description("Align the active block left, center, or right.")
            .keywords(["align", "center", "right"])
            .args_example(serde_json::json!({ "align": "center" })),
        ]
    }
}

struct NormalizeAlignAttrs;

impl NormalizePass for NormalizeAlignAttrs {
    fn id(&self) -> &'static str {
        "align.normalize_attrs"
    }

    fn run(&self, doc: &Document, registry: &PluginRegistry) -> Vec<Op> {
        let mut ops = Vec::new();
        walk_elements(doc, registry, &mut |el, path| {
            let Some(align) = el.attr_str("align") else {
                return;
            };
            if matches!(align, "center" | "right") {
                return;
            }
            ops.push(Op::SetNodeAttrs {
                path: path.to_vec(),
                patch: crate::core::AttrPatch {
                    set: Attrs::default(),
                    remove: vec!["align".to_string()],
                },
            });
        });
        ops
    }
}

/// Visit every element in the document, depth first, skipping the
/// children of inline-only blocks.
pub(crate) fn walk_elements(
    doc: &Document,
    registry: &PluginRegistry,
    visit: &mut dyn FnMut(&ElementNode, &[usize]),
) {
    fn walk(
        children: &[Node],
        path: &mut Vec<usize>,
        registry: &PluginRegistry,
        visit: &mut dyn FnMut(&ElementNode, &[usize]),
    ) {
        for (ix, node) in children.iter().enumerate() {
            let Node::Element(el) = node else {
                continue;
            };
            path.push(ix);
            visit(el, path);
            if registry.child_constraint(&el.kind) != ChildConstraint::InlineOnly {
                walk(&el.children, path, registry, visit);
            }
            path.pop();
        }
    }

    walk(&doc.children, &mut Vec::new(), registry, visit);
}

/// The element containing the focus point's text leaf.
pub(crate) fn focus_block(editor: &crate::core::Editor) -> Option<&ElementNode> {
    let path = focus_block_path(editor)?;
    match node_at_path(editor.doc(), &path) {
        Some(Node::Element(el)) => Some(el),
        _ => None,
    }
}

pub(crate) fn focus_block_path(editor: &crate::core::Editor) -> Option<Path> {
    let focus = &editor.selection().focus;
    let (_, block_path) = focus.path.split_last()?;
    if block_path.is_empty() {
        return None;
    }
    Some(block_path.to_vec())
}

fn convert_focus_block(
    editor: &crate::core::Editor,
    kind: &str,
    edit_attrs: impl FnOnce(&mut Attrs),
) -> Result<Transaction, String> {
    let Some(block_path) = focus_block_path(editor) else {
        return Err("No active block".to_string());
    };
    let Some(Node::Element(el)) = node_at_path(editor.doc(), &block_path) else {
        return Err("Focus is not inside an element".to_string());
    };
    if !element_is_text_block(el, editor.registry()) {
        return Err(format!("Cannot convert a {} block", el.kind));
    }

    let mut attrs = el.attrs.clone();
    edit_attrs(&mut attrs);
    let node = Node::Element(ElementNode {
        kind: kind.to_string(),
        attrs,
        children: el.children.clone(),
    });
    let selection = editor.selection().clone();
    Ok(Transaction::new(replace_node_ops(&block_path, node)).selection_after(selection))
}

pub(crate) fn apply_or_noop(
    editor: &mut crate::core::Editor,
    tx: Transaction,
) -> Result<(), CommandError> {
    if tx.ops.is_empty() {
        return Ok(());
    }
    editor
        .apply(tx)
        .map_err(|e| CommandError::new(format!("Failed to apply transaction: {e:?}")))
}
