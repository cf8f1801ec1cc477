use rand::Rng;
use rand::distributions::Alphanumeric;
use std::path::Path;

/// Length of the random file name component of a storage path.
pub const TOKEN_LENGTH: usize = 40;

/// Directory slug for an owner kind: the last segment of a qualified name,
/// snake-cased. `App\Models\BlogPost` and `crate::BlogPost` both give `blog_post`.
pub fn owner_kind_slug(kind: &str) -> String {
    let short = kind
        .rsplit([':', '\\', '/'])
        .find(|segment| !segment.is_empty())
        .unwrap_or(kind);
    let slug = snake_case(short);
    if slug.is_empty() {
        "owner".to_string()
    } else {
        slug
    }
}

/// Canonical form of a type tag. Blank tags are the untyped sentinel (`None`).
pub fn normalize_type(tag: Option<&str>) -> Option<String> {
    let lowered = tag?.trim().to_lowercase();
    let normalized = snake_case(&lowered);
    if normalized.is_empty() {
        None
    } else {
        Some(normalized)
    }
}

pub fn random_token() -> String {
    rand::thread_rng()
        .sample_iter(&Alphanumeric)
        .take(TOKEN_LENGTH)
        .map(char::from)
        .collect()
}

/// `<owner-kind-slug>/<random token>[.<ext>]`, with the extension taken from
/// the original file name.
pub fn storage_path_for(owner_kind: &str, original_name: &str) -> String {
    let ext = Path::new(original_name)
        .extension()
        .and_then(|e| e.to_str())
        .map(str::trim)
        .filter(|e| !e.is_empty() && e.chars().all(|c| c.is_ascii_alphanumeric()));

    match ext {
        Some(ext) => format!("{}/{}.{}", owner_kind_slug(owner_kind), random_token(), ext),
        None => format!("{}/{}", owner_kind_slug(owner_kind), random_token()),
    }
}

/// Whether `path` has the shape produced by [`storage_path_for`]. Other
/// objects on a shared disk are never treated as attachment bytes.
pub fn is_attachment_path(path: &str) -> bool {
    let Some((dir, file)) = path.split_once('/') else {
        return false;
    };

    let dir_ok = !dir.is_empty()
        && dir
            .chars()
            .all(|c| c == '_' || (c.is_alphanumeric() && !c.is_uppercase()));

    let (token, ext) = match file.split_once('.') {
        Some((token, ext)) => (token, Some(ext)),
        None => (file, None),
    };
    let token_ok =
        token.len() == TOKEN_LENGTH && token.chars().all(|c| c.is_ascii_alphanumeric());
    let ext_ok = ext.is_none_or(|e| !e.is_empty() && e.chars().all(|c| c.is_ascii_alphanumeric()));

    dir_ok && token_ok && ext_ok
}

fn snake_case(input: &str) -> String {
    let chars: Vec<char> = input.trim().chars().collect();
    let mut out = String::with_capacity(chars.len() + 4);

    for (i, &c) in chars.iter().enumerate() {
        if !c.is_alphanumeric() {
            push_separator(&mut out);
            continue;
        }

        if c.is_uppercase() && i > 0 {
            let prev = chars[i - 1];
            let next_is_lower = chars.get(i + 1).is_some_and(|n| n.is_lowercase());
            if prev.is_lowercase() || prev.is_ascii_digit() || (prev.is_uppercase() && next_is_lower) {
                push_separator(&mut out);
            }
        }
        out.extend(c.to_lowercase());
    }

    out.trim_matches('_').to_string()
}

fn push_separator(out: &mut String) {
    if !out.is_empty() && !out.ends_with('_') {
        out.push('_');
    }
}
