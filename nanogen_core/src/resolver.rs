use crate::ComponentDeclaration;

/// Wrapper generic used for list fields in generated code.
pub const LIST_WRAPPER: &str = "NanoList";

/// Append a `None` placeholder for every context that no declaration belongs
/// to, so each context still receives its boilerplate documents.
///
/// Placeholders are scoped to a single context and never created twice for the
/// same context, even when `contexts` repeats a name.
pub fn resolve(
	mut declarations: Vec<ComponentDeclaration>,
	contexts: &[String],
) -> Vec<ComponentDeclaration> {
	let mut pool: Vec<ComponentDeclaration> = vec![];

	for context in contexts {
		let covered = declarations.iter().any(|d| d.belongs_to(context));
		let pooled = pool.iter().any(|d| d.belongs_to(context));
		if covered || pooled {
			continue;
		}

		tracing::debug!(%context, "synthesizing placeholder component");
		pool.push(ComponentDeclaration::none(context));
	}

	declarations.extend(pool);
	declarations
}

/// Rewrite list-typed fields to the runtime list wrapper.
pub fn normalize_field_types(declaration: &mut ComponentDeclaration) {
	for field in &mut declaration.fields {
		if let Some(wrapped) = normalize_list_type(&field.r#type) {
			field.r#type = wrapped;
		}
	}
}

/// `List<Vector3>` becomes `NanoList<Vector3>`. Returns `None` for types that
/// are not generic lists or are already wrapped.
///
/// ```
/// use nanogen_core::normalize_list_type;
///
/// assert_eq!(normalize_list_type("List<Vector3>").as_deref(), Some("NanoList<Vector3>"));
/// assert_eq!(normalize_list_type("int"), None);
/// ```
pub fn normalize_list_type(r#type: &str) -> Option<String> {
	let open = r#type.find('<')?;
	let close = r#type.rfind('>')?;
	let base = &r#type[..open];
	let base_name = base.rsplit('.').next().unwrap_or(base);

	if close < open
		|| close + 1 != r#type.len()
		|| !base_name.contains("List")
		|| base_name == LIST_WRAPPER
	{
		return None;
	}

	let inner = &r#type[open + 1..close];
	Some(format!("{LIST_WRAPPER}<{inner}>"))
}
