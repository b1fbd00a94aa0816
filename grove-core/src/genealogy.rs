//! Validated, immutable family trees.
//!
//! A [`GenealogyDocument`] is the structured input (usually parsed from
//! JSON or a YAML family file). [`Genealogy::load`] checks it once and either returns a tree
//! that every later stage can trust, or a [`StructuralError`] naming the
//! offending ids. Nothing partial is ever exposed.

use crate::error::{LoadError, StructuralError};
use crate::types::PersonId;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;

/// One person record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Person {
    pub id: PersonId,
    pub name: String,
    #[serde(default)]
    pub biography: String,
    #[serde(default)]
    pub birth_year: Option<i32>,
    #[serde(default)]
    pub death_year: Option<i32>,
    #[serde(default)]
    pub children: Vec<PersonId>,
}

impl Person {
    pub fn new(id: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            biography: String::new(),
            birth_year: None,
            death_year: None,
            children: Vec::new(),
        }
    }

    pub fn with_biography(mut self, biography: impl Into<String>) -> Self {
        self.biography = biography.into();
        self
    }

    pub fn with_children<I, S>(mut self, children: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.children = children.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_years(mut self, birth: Option<i32>, death: Option<i32>) -> Self {
        self.birth_year = birth;
        self.death_year = death;
        self
    }

    pub fn lifespan(&self) -> Lifespan {
        Lifespan {
            birth: self.birth_year,
            death: self.death_year,
        }
    }
}

/// Birth and death years. Open-ended when the death year is absent.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Lifespan {
    pub birth: Option<i32>,
    pub death: Option<i32>,
}

impl Lifespan {
    pub fn is_open_ended(&self) -> bool {
        self.death.is_none()
    }
}

impl fmt::Display for Lifespan {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match (self.birth, self.death) {
            (Some(b), Some(d)) => write!(f, "{b} - {d}"),
            (Some(b), None) => write!(f, "{b} - present"),
            (None, Some(d)) => write!(f, "? - {d}"),
            (None, None) => Ok(()),
        }
    }
}

/// Typed record handed to an info panel.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PersonInfo {
    pub id: PersonId,
    pub name: String,
    pub lifespan: Lifespan,
    pub biography: String,
}

/// The structured input: a root id plus ordered person records.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GenealogyDocument {
    #[serde(default)]
    pub name: Option<String>,
    pub root: PersonId,
    pub people: Vec<Person>,
}

impl GenealogyDocument {
    pub fn new(root: impl Into<String>) -> Self {
        Self {
            name: None,
            root: root.into(),
            people: Vec::new(),
        }
    }

    /// Appends a person record, keeping document order.
    pub fn person(mut self, person: Person) -> Self {
        self.people.push(person);
        self
    }

    /// Parses a JSON family document. Structure is not checked here.
    pub fn from_json(text: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(text)
    }

    /// Parses a YAML family file (a `family: {name, root}` header
    /// followed by `people`). Structure is not checked here.
    pub fn from_yaml(text: &str) -> Result<Self, serde_yaml::Error> {
        let file: FamilyFile = serde_yaml::from_str(text)?;
        Ok(Self {
            name: Some(file.family.name),
            root: file.family.root,
            people: file.people,
        })
    }
}

#[derive(Deserialize)]
struct FamilyFile {
    family: FamilyHeader,
    people: Vec<Person>,
}

#[derive(Deserialize)]
struct FamilyHeader {
    name: String,
    root: PersonId,
}

/// A validated family tree.
///
/// People are stored in document order; `index` maps ids into `people`.
#[derive(Debug, Clone)]
pub struct Genealogy {
    name: Option<String>,
    root: usize,
    people: Vec<Person>,
    index: HashMap<PersonId, usize>,
}

#[derive(Clone, Copy, PartialEq, Eq)]
enum Visit {
    New,
    OnStack,
    Done,
}

impl Genealogy {
    /// Validates `doc` and builds the tree.
    ///
    /// Checks, in order: unique ids, root exists, children exist, single
    /// parent per child (root has none), no cycles, everyone descends
    /// from the root.
    pub fn load(doc: GenealogyDocument) -> Result<Self, StructuralError> {
        let GenealogyDocument { name, root, people } = doc;

        let mut index = HashMap::with_capacity(people.len());
        for (i, p) in people.iter().enumerate() {
            if index.insert(p.id.clone(), i).is_some() {
                return Err(StructuralError::DuplicateId { id: p.id.clone() });
            }
        }

        let Some(&root_idx) = index.get(&root) else {
            return Err(StructuralError::MissingRoot { root });
        };

        let mut parent_of: Vec<Option<usize>> = vec![None; people.len()];
        for (pi, p) in people.iter().enumerate() {
            for child in &p.children {
                let Some(&ci) = index.get(child) else {
                    return Err(StructuralError::DanglingChild {
                        parent: p.id.clone(),
                        child: child.clone(),
                    });
                };
                if ci == root_idx {
                    return Err(StructuralError::RootHasParent {
                        root: root.clone(),
                        parent: p.id.clone(),
                    });
                }
                if let Some(first) = parent_of[ci] {
                    return Err(StructuralError::DuplicateParent {
                        child: child.clone(),
                        first_parent: people[first].id.clone(),
                        second_parent: p.id.clone(),
                    });
                }
                parent_of[ci] = Some(pi);
            }
        }

        let genealogy = Self {
            name,
            root: root_idx,
            people,
            index,
        };
        genealogy.check_acyclic()?;
        genealogy.check_reachable()?;

        Ok(genealogy)
    }

    /// Parses JSON and validates it in one step.
    pub fn from_json(text: &str) -> Result<Self, LoadError> {
        Ok(Self::load(GenealogyDocument::from_json(text)?)?)
    }

    /// Parses a YAML family file and validates it in one step.
    pub fn from_yaml(text: &str) -> Result<Self, LoadError> {
        Ok(Self::load(GenealogyDocument::from_yaml(text)?)?)
    }

    /// Depth-first search with an explicit stack and on-stack marks.
    ///
    /// Starts at the root, then from every unvisited person in document
    /// order, so cycles detached from the root are found as well.
    fn check_acyclic(&self) -> Result<(), StructuralError> {
        let mut state = vec![Visit::New; self.people.len()];
        let starts = std::iter::once(self.root).chain(0..self.people.len());

        for start in starts {
            if state[start] != Visit::New {
                continue;
            }
            // Frames are (person, next child position).
            let mut stack: Vec<(usize, usize)> = vec![(start, 0)];
            state[start] = Visit::OnStack;

            while let Some(frame) = stack.last_mut() {
                let (pi, next) = *frame;
                let Some(child_id) = self.people[pi].children.get(next) else {
                    state[pi] = Visit::Done;
                    stack.pop();
                    continue;
                };
                frame.1 += 1;

                let ci = self.index[child_id];
                match state[ci] {
                    Visit::New => {
                        state[ci] = Visit::OnStack;
                        stack.push((ci, 0));
                    }
                    Visit::OnStack => {
                        let from = stack.iter().position(|&(p, _)| p == ci).unwrap_or(0);
                        let mut path: Vec<String> = stack[from..]
                            .iter()
                            .map(|&(p, _)| self.people[p].id.clone())
                            .collect();
                        path.push(child_id.clone());
                        return Err(StructuralError::Cycle { path });
                    }
                    Visit::Done => {
                        let first_parent = self
                            .people
                            .iter()
                            .find(|p| p.children.contains(child_id))
                            .map(|p| p.id.clone())
                            .unwrap_or_default();
                        return Err(StructuralError::DuplicateParent {
                            child: child_id.clone(),
                            first_parent,
                            second_parent: self.people[pi].id.clone(),
                        });
                    }
                }
            }
        }
        Ok(())
    }

    /// Rejects people the root never reaches, listed in document order.
    fn check_reachable(&self) -> Result<(), StructuralError> {
        let mut reached = vec![false; self.people.len()];
        let mut stack = vec![self.root];
        while let Some(pi) = stack.pop() {
            reached[pi] = true;
            stack.extend(self.people[pi].children.iter().map(|c| self.index[c]));
        }

        let ids: Vec<String> = self
            .people
            .iter()
            .zip(&reached)
            .filter(|(_, reached)| !**reached)
            .map(|(p, _)| p.id.clone())
            .collect();
        if ids.is_empty() {
            return Ok(());
        }
        log::warn!("{} person(s) are not descendants of root '{}'", ids.len(), self.root_id());
        Err(StructuralError::Unreachable {
            root: self.root_id().to_string(),
            ids,
        })
    }

    pub fn name(&self) -> Option<&str> {
        self.name.as_deref()
    }

    pub fn root(&self) -> &Person {
        &self.people[self.root]
    }

    pub fn root_id(&self) -> &str {
        &self.people[self.root].id
    }

    pub fn get(&self, id: &str) -> Option<&Person> {
        self.index.get(id).map(|&i| &self.people[i])
    }

    /// Children of `id` in stored order; empty for unknown ids.
    pub fn children_of(&self, id: &str) -> Vec<&Person> {
        self.get(id)
            .map(|p| p.children.iter().filter_map(|c| self.get(c)).collect())
            .unwrap_or_default()
    }

    pub fn len(&self) -> usize {
        self.people.len()
    }

    pub fn is_empty(&self) -> bool {
        self.people.is_empty()
    }

    pub fn people(&self) -> impl Iterator<Item = &Person> {
        self.people.iter()
    }

    /// Root first, then each subtree in stored child order.
    pub fn iter_preorder(&self) -> PreorderIter<'_> {
        PreorderIter {
            tree: self,
            stack: vec![self.root],
        }
    }

    pub fn reachable_count(&self) -> usize {
        self.iter_preorder().count()
    }

    /// Number of generations below and including the root.
    pub fn max_depth(&self) -> usize {
        let mut max = 0;
        let mut stack = vec![(self.root, 1usize)];
        while let Some((pi, depth)) = stack.pop() {
            max = max.max(depth);
            for c in &self.people[pi].children {
                stack.push((self.index[c], depth + 1));
            }
        }
        max
    }

    pub fn info(&self, id: &str) -> Option<PersonInfo> {
        self.get(id).map(|p| PersonInfo {
            id: p.id.clone(),
            name: p.name.clone(),
            lifespan: p.lifespan(),
            biography: p.biography.clone(),
        })
    }
}

pub struct PreorderIter<'a> {
    tree: &'a Genealogy,
    stack: Vec<usize>,
}

impl<'a> Iterator for PreorderIter<'a> {
    type Item = &'a Person;

    fn next(&mut self) -> Option<Self::Item> {
        let pi = self.stack.pop()?;
        let person = &self.tree.people[pi];
        // Reverse so the first child is yielded first.
        for c in person.children.iter().rev() {
            self.stack.push(self.tree.index[c]);
        }
        Some(person)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE_JSON: &str = r#"{
        "name": "Test Family",
        "root": "grandparent",
        "people": [
            { "id": "grandparent", "name": "Grand Parent",
              "biography": "The founder of our family line.",
              "birth_year": 1920, "death_year": 2000,
              "children": ["parent1", "parent2"] },
            { "id": "parent1", "name": "Parent One", "biography": "First child.",
              "children": ["child1"] },
            { "id": "parent2", "name": "Parent Two", "biography": "Second child." },
            { "id": "child1", "name": "Child One", "birth_year": 1990 }
        ]
    }"#;

    fn load(doc: GenealogyDocument) -> Result<Genealogy, StructuralError> {
        Genealogy::load(doc)
    }

    #[test]
    fn parses_and_indexes_json() {
        let tree = Genealogy::from_json(SAMPLE_JSON).unwrap();
        assert_eq!(tree.name(), Some("Test Family"));
        assert_eq!(tree.len(), 4);
        assert_eq!(tree.root().name, "Grand Parent");
        assert_eq!(tree.get("child1").unwrap().biography, "");
    }

    #[test]
    fn children_keep_stored_order() {
        let tree = Genealogy::from_json(SAMPLE_JSON).unwrap();
        let ids: Vec<_> = tree
            .children_of("grandparent")
            .iter()
            .map(|p| p.id.as_str())
            .collect();
        assert_eq!(ids, ["parent1", "parent2"]);
        assert!(tree.children_of("nobody").is_empty());
    }

    #[test]
    fn preorder_and_depth() {
        let tree = Genealogy::from_json(SAMPLE_JSON).unwrap();
        let ids: Vec<_> = tree.iter_preorder().map(|p| p.id.as_str()).collect();
        assert_eq!(ids, ["grandparent", "parent1", "child1", "parent2"]);
        assert_eq!(tree.max_depth(), 3);
        assert_eq!(tree.reachable_count(), 4);
    }

    #[test]
    fn info_reports_lifespan() {
        let tree = Genealogy::from_json(SAMPLE_JSON).unwrap();
        let info = tree.info("grandparent").unwrap();
        assert_eq!(info.lifespan.to_string(), "1920 - 2000");
        let info = tree.info("child1").unwrap();
        assert!(info.lifespan.is_open_ended());
        assert_eq!(info.lifespan.to_string(), "1990 - present");
        assert!(tree.info("nobody").is_none());
    }

    #[test]
    fn lifespan_formats() {
        let l = |b, d| Lifespan { birth: b, death: d }.to_string();
        assert_eq!(l(None, Some(1880)), "? - 1880");
        assert_eq!(l(None, None), "");
    }

    #[test]
    fn missing_root_is_rejected() {
        let doc = GenealogyDocument::new("nonexistent").person(Person::new("someone", "Someone"));
        let err = load(doc).unwrap_err();
        assert_eq!(
            err,
            StructuralError::MissingRoot {
                root: "nonexistent".into()
            }
        );
        assert!(err.to_string().contains("not found"));
    }

    #[test]
    fn dangling_child_is_rejected() {
        let doc = GenealogyDocument::new("parent")
            .person(Person::new("parent", "Parent").with_children(["missing-child"]));
        assert_eq!(
            load(doc).unwrap_err(),
            StructuralError::DanglingChild {
                parent: "parent".into(),
                child: "missing-child".into()
            }
        );
    }

    #[test]
    fn duplicate_ids_are_rejected() {
        let doc = GenealogyDocument::new("a")
            .person(Person::new("a", "A"))
            .person(Person::new("a", "Again"));
        assert!(matches!(load(doc), Err(StructuralError::DuplicateId { .. })));
    }

    #[test]
    fn child_with_two_parents_is_rejected() {
        let doc = GenealogyDocument::new("r")
            .person(Person::new("r", "R").with_children(["a", "b"]))
            .person(Person::new("a", "A").with_children(["c"]))
            .person(Person::new("b", "B").with_children(["c"]))
            .person(Person::new("c", "C"));
        assert_eq!(
            load(doc).unwrap_err(),
            StructuralError::DuplicateParent {
                child: "c".into(),
                first_parent: "a".into(),
                second_parent: "b".into()
            }
        );
    }

    #[test]
    fn root_listed_as_child_is_rejected() {
        let doc = GenealogyDocument::new("r")
            .person(Person::new("r", "R").with_children(["a"]))
            .person(Person::new("a", "A").with_children(["r"]));
        assert!(matches!(load(doc), Err(StructuralError::RootHasParent { .. })));
    }

    #[test]
    fn detached_cycle_is_rejected() {
        let doc = GenealogyDocument::new("r")
            .person(Person::new("r", "R"))
            .person(Person::new("x", "X").with_children(["y"]))
            .person(Person::new("y", "Y").with_children(["x"]));
        let err = load(doc).unwrap_err();
        assert_eq!(
            err,
            StructuralError::Cycle {
                path: vec!["x".into(), "y".into(), "x".into()]
            }
        );
    }

    #[test]
    fn self_loop_is_a_cycle() {
        let doc = GenealogyDocument::new("r")
            .person(Person::new("r", "R"))
            .person(Person::new("x", "X").with_children(["x"]));
        assert!(matches!(load(doc), Err(StructuralError::Cycle { .. })));
    }

    #[test]
    fn people_outside_the_root_lineage_are_rejected() {
        let doc = GenealogyDocument::new("r")
            .person(Person::new("r", "R").with_children(["a"]))
            .person(Person::new("orphan", "Orphan").with_children(["stray"]))
            .person(Person::new("a", "A"))
            .person(Person::new("stray", "Stray"));
        assert_eq!(
            load(doc).unwrap_err(),
            StructuralError::Unreachable {
                root: "r".into(),
                ids: vec!["orphan".into(), "stray".into()]
            }
        );
    }

    #[test]
    fn lone_separate_person_is_rejected() {
        let doc = GenealogyDocument::new("A")
            .person(Person::new("A", "A"))
            .person(Person::new("Z", "Z"));
        let err = load(doc).unwrap_err();
        assert!(matches!(err, StructuralError::Unreachable { ref ids, .. } if ids == &["Z"]));
    }

    #[test]
    fn every_loaded_person_is_reachable() {
        let tree = Genealogy::from_json(SAMPLE_JSON).unwrap();
        assert_eq!(tree.reachable_count(), tree.len());
    }

    const SAMPLE_YAML: &str = r#"
family:
  name: "Test Family"
  root: "grandparent"

people:
  - id: "grandparent"
    name: "Grand Parent"
    biography: "The founder of our family line."
    birth_year: 1920
    death_year: 2000
    children:
      - "parent1"
      - "parent2"

  - id: "parent1"
    name: "Parent One"
    biography: "First child."
    children:
      - "child1"

  - id: "parent2"
    name: "Parent Two"
    biography: "Second child."
    children: []

  - id: "child1"
    name: "Child One"
    biography: "The youngest generation."
"#;

    #[test]
    fn parses_yaml_family_file() {
        let tree = Genealogy::from_yaml(SAMPLE_YAML).unwrap();
        assert_eq!(tree.name(), Some("Test Family"));
        assert_eq!(tree.len(), 4);
        assert_eq!(tree.root_id(), "grandparent");
        assert_eq!(tree.max_depth(), 3);
        let ids: Vec<_> = tree.iter_preorder().map(|p| p.id.as_str()).collect();
        assert_eq!(ids, ["grandparent", "parent1", "child1", "parent2"]);
        assert_eq!(tree.info("grandparent").unwrap().lifespan.to_string(), "1920 - 2000");
        assert!(tree.get("child1").unwrap().birth_year.is_none());
    }

    #[test]
    fn yaml_and_json_describe_the_same_tree() {
        let yaml = Genealogy::from_yaml(SAMPLE_YAML).unwrap();
        let json = Genealogy::from_json(SAMPLE_JSON).unwrap();
        let ids = |t: &Genealogy| t.iter_preorder().map(|p| p.id.clone()).collect::<Vec<_>>();
        assert_eq!(ids(&yaml), ids(&json));
    }

    #[test]
    fn yaml_structure_is_validated() {
        let yaml = r#"
family:
  name: "Bad"
  root: "parent"
people:
  - id: "parent"
    name: "Parent"
    children:
      - "missing-child"
"#;
        assert!(matches!(
            Genealogy::from_yaml(yaml),
            Err(LoadError::Structure(StructuralError::DanglingChild { .. }))
        ));
    }

    #[test]
    fn yaml_without_header_is_a_parse_error() {
        let yaml = "people:\n  - id: a\n    name: A\n";
        assert!(matches!(Genealogy::from_yaml(yaml), Err(LoadError::Yaml(_))));
    }

    #[test]
    fn json_parse_errors_are_reported() {
        assert!(matches!(
            Genealogy::from_json("{ \"root\": 3 }"),
            Err(LoadError::Parse(_))
        ));
    }
}
