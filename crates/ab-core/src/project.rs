//! Project JSON: import/export of the full artboard state.
//!
//! The on-disk shape nests group children inside their parent element, while
//! the in-memory [`ElementTree`] is an arena — conversion walks both ways.
//! Validation is accumulation-style: every problem is reported as a string,
//! empty list means valid. Import never builds a tree from an invalid
//! project.

use crate::bounds::Canvas;
use crate::grid::{GridSettings, MIN_GRID_DIVISIONS};
use crate::id::ElementId;
use crate::model::{DesignElement, ElementKind};
use crate::tree::ElementTree;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

/// One element in the nested project shape.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProjectElement {
    #[serde(flatten)]
    pub element: DesignElement,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub children: Vec<ProjectElement>,
}

/// The whole persisted project.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Project {
    #[serde(default)]
    pub canvas: Canvas,
    #[serde(default)]
    pub grid: GridSettings,
    #[serde(default)]
    pub elements: Vec<ProjectElement>,
}

impl Project {
    pub fn from_tree(tree: &ElementTree, canvas: Canvas, grid: GridSettings) -> Self {
        fn collect(tree: &ElementTree, id: ElementId) -> Option<ProjectElement> {
            let element = tree.get(id)?.clone();
            let children = tree
                .children(id)
                .into_iter()
                .filter_map(|c| collect(tree, c))
                .collect();
            Some(ProjectElement { element, children })
        }

        Self {
            canvas,
            grid,
            elements: tree
                .top_level()
                .into_iter()
                .filter_map(|id| collect(tree, id))
                .collect(),
        }
    }

    /// Build an element tree from the project. Fails with the full problem
    /// list when validation finds anything.
    pub fn into_tree(self) -> Result<(Canvas, GridSettings, ElementTree), Vec<String>> {
        let problems = validate_project(&self);
        if !problems.is_empty() {
            return Err(problems);
        }

        fn insert(tree: &mut ElementTree, parent: Option<ElementId>, pe: ProjectElement) {
            let id = pe.element.id;
            if tree.insert(parent, pe.element).is_some() {
                for child in pe.children {
                    insert(tree, Some(id), child);
                }
            }
        }

        let mut tree = ElementTree::new();
        for pe in self.elements {
            insert(&mut tree, None, pe);
        }
        let mut grid = self.grid;
        grid.normalize();
        Ok((self.canvas, grid, tree))
    }

    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string_pretty(self)
    }

    pub fn from_json(json: &str) -> serde_json::Result<Self> {
        serde_json::from_str(json)
    }
}

/// Structural validation of a project. Returns every problem found rather
/// than stopping at the first.
pub fn validate_project(project: &Project) -> Vec<String> {
    let mut problems = Vec::new();

    if project.canvas.width <= 0.0 || project.canvas.height <= 0.0 {
        problems.push(format!(
            "canvas dimensions must be positive, got {}x{}",
            project.canvas.width, project.canvas.height
        ));
    }
    if project.grid.rows < MIN_GRID_DIVISIONS || project.grid.columns < MIN_GRID_DIVISIONS {
        problems.push(format!(
            "grid must have at least {MIN_GRID_DIVISIONS} rows and columns, got {}x{}",
            project.grid.rows, project.grid.columns
        ));
    }

    let mut seen = HashSet::new();
    for pe in &project.elements {
        validate_element(pe, &mut seen, &mut problems);
    }
    problems
}

fn validate_element(pe: &ProjectElement, seen: &mut HashSet<ElementId>, problems: &mut Vec<String>) {
    let el = &pe.element;
    if !seen.insert(el.id) {
        problems.push(format!("duplicate element id: {}", el.id));
    }
    if el.width < 0.0 || el.height < 0.0 {
        problems.push(format!(
            "element {} has negative dimensions {}x{}",
            el.id, el.width, el.height
        ));
    }
    if !(0.0..=1.0).contains(&el.style.opacity) {
        problems.push(format!(
            "element {} opacity {} out of range [0, 1]",
            el.id, el.style.opacity
        ));
    }
    if let ElementKind::Line { options } = &el.kind
        && options.points.len() < 2
    {
        problems.push(format!(
            "line element {} needs at least 2 points, got {}",
            el.id,
            options.points.len()
        ));
    }
    if !pe.children.is_empty() && !el.is_group() {
        problems.push(format!(
            "element {} has children but is not a group",
            el.id
        ));
    }
    for child in &pe.children {
        validate_element(child, seen, problems);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn sample_tree() -> ElementTree {
        let mut tree = ElementTree::new();
        let gid = tree
            .insert(
                None,
                DesignElement::new(ElementId::intern("proj_grp"), "Group", ElementKind::Group)
                    .with_geometry(100.0, 100.0, 400.0, 300.0),
            )
            .unwrap();
        tree.insert(
            Some(gid),
            DesignElement::new(ElementId::intern("proj_child"), "Rect", ElementKind::Rect)
                .with_geometry(10.0, 10.0, 50.0, 50.0),
        );
        tree.insert(
            None,
            DesignElement::new(ElementId::intern("proj_circle"), "Circle", ElementKind::Circle)
                .with_geometry(700.0, 200.0, 120.0, 120.0),
        );
        tree
    }

    #[test]
    fn project_tree_roundtrip() {
        let tree = sample_tree();
        let project = Project::from_tree(&tree, Canvas::default(), GridSettings::default());
        let json = project.to_json().unwrap();
        let parsed = Project::from_json(&json).unwrap();
        let (_, _, rebuilt) = parsed.into_tree().unwrap();

        assert_eq!(rebuilt.flatten(), tree.flatten());
        assert_eq!(
            rebuilt.absolute_position(ElementId::intern("proj_child")),
            Some((110.0, 110.0))
        );
    }

    #[test]
    fn validation_accumulates_all_problems() {
        let mut project = Project::from_tree(
            &sample_tree(),
            Canvas {
                width: 0.0,
                height: 2160.0,
            },
            GridSettings::default(),
        );
        project.grid.rows = 1;
        project.elements[0].element.style.opacity = 3.0;

        let problems = validate_project(&project);
        assert_eq!(problems.len(), 3);
        assert!(project.into_tree().is_err());
    }

    #[test]
    fn duplicate_ids_reported() {
        let el = DesignElement::new(ElementId::intern("twice"), "Rect", ElementKind::Rect);
        let project = Project {
            elements: vec![
                ProjectElement {
                    element: el.clone(),
                    children: vec![],
                },
                ProjectElement {
                    element: el,
                    children: vec![],
                },
            ],
            ..Default::default()
        };
        let problems = validate_project(&project);
        assert!(problems.iter().any(|p| p.contains("duplicate")));
    }
}
