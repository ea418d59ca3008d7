use tracing::warn;

pub type Program<'src> = Vec<Node<'src>>;
pub type Block<'src> = Vec<Node<'src>>;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Node<'src> {
    /// `say "text"`
    Emit(&'src str),
    FunctionDef {
        name: &'src str,
        body: Block<'src>,
    },
    /// A bare identifier statement.
    FunctionCall(&'src str),
    /// Raw text captured from `__c__ { ... }`.
    ForeignBlock(&'src str),
}

impl<'src> Node<'src> {
    pub fn is_function_def(&self) -> bool {
        matches!(self, Node::FunctionDef { .. })
    }
}

/// Function definitions of one program in first-definition order. A later
/// definition with the same name replaces the earlier body in place.
#[derive(Debug, Default)]
pub struct FunctionRegistry<'a, 'src> {
    functions: Vec<(&'src str, &'a [Node<'src>])>,
}

impl<'a, 'src> FunctionRegistry<'a, 'src> {
    pub fn from_program(program: &'a Program<'src>) -> Self {
        let mut registry = Self::default();
        for node in program {
            if let Node::FunctionDef { name, body } = node {
                registry.insert(name, body);
            }
        }
        registry
    }

    pub fn insert(&mut self, name: &'src str, body: &'a [Node<'src>]) {
        match self.functions.iter_mut().find(|(known, _)| *known == name) {
            Some(entry) => {
                warn!(name, "function defined more than once; keeping the last body");
                entry.1 = body;
            }
            None => self.functions.push((name, body)),
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = (&'src str, &'a [Node<'src>])> + '_ {
        self.functions.iter().copied()
    }
}
