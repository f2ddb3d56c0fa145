//! Stack metadata conversions.

use tm_plugin_proto::messages::StackMetadata;
use tm_project::StackDecl;

/// Metadata view of a stack; empty when the node declares none.
#[must_use]
pub fn stack_metadata(stack: Option<&StackDecl>) -> StackMetadata {
    let Some(stack) = stack else {
        return StackMetadata::default();
    };
    StackMetadata {
        name: stack.name.clone(),
        description: stack.description.clone(),
        tags: stack.tags.clone(),
        after: stack.after.clone(),
        before: stack.before.clone(),
        wants: stack.wants.clone(),
        wanted_by: stack.wanted_by.clone(),
        watch: stack.watch.clone(),
    }
}

/// Applies `metadata` to `stack`.
///
/// Without `merge` every field is replaced. With `merge`, scalars are only
/// filled when currently empty, and lists are replaced when empty and
/// extended otherwise. Appends are not de-duplicated.
///
/// # Example
///
/// ```
/// use tm_plugin_proto::messages::StackMetadata;
/// use tm_plugins::host::apply_stack_metadata;
/// use tm_project::StackDecl;
///
/// let mut stack = StackDecl { tags: vec!["a".into(), "b".into()], ..StackDecl::default() };
/// let update = StackMetadata { tags: vec!["c".into()], ..StackMetadata::default() };
/// apply_stack_metadata(&mut stack, &update, true);
/// assert_eq!(stack.tags, ["a", "b", "c"]);
/// apply_stack_metadata(&mut stack, &update, false);
/// assert_eq!(stack.tags, ["c"]);
/// ```
pub fn apply_stack_metadata(stack: &mut StackDecl, metadata: &StackMetadata, merge: bool) {
    apply_scalar(&mut stack.name, &metadata.name, merge);
    apply_scalar(&mut stack.description, &metadata.description, merge);
    apply_list(&mut stack.tags, &metadata.tags, merge);
    apply_list(&mut stack.after, &metadata.after, merge);
    apply_list(&mut stack.before, &metadata.before, merge);
    apply_list(&mut stack.wants, &metadata.wants, merge);
    apply_list(&mut stack.wanted_by, &metadata.wanted_by, merge);
    apply_list(&mut stack.watch, &metadata.watch, merge);
}

fn apply_scalar(current: &mut String, incoming: &str, merge: bool) {
    if !merge || current.is_empty() {
        incoming.clone_into(current);
    }
}

fn apply_list(current: &mut Vec<String>, incoming: &[String], merge: bool) {
    if !merge || current.is_empty() {
        *current = incoming.to_vec();
    } else {
        current.extend_from_slice(incoming);
    }
}
