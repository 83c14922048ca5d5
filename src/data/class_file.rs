// ============================================================
// Layer 4: Class-Name File Loader
// ============================================================
// Reads the class-name file from disk and hands the text to the
// domain parser. Both failures (unreadable file, wrong number of
// names) surface as ClassNamesError so main can report them and
// exit before any training work starts.

use std::{fs, path::Path};

use crate::domain::class_names::{ClassNames, ClassNamesError};

pub fn load_class_names(
    path:      impl AsRef<Path>,
    class_num: usize,
) -> Result<ClassNames, ClassNamesError> {
    let path = path.as_ref();
    let text = fs::read_to_string(path).map_err(|source| ClassNamesError::Open {
        path: path.to_path_buf(),
        source,
    })?;

    let names = ClassNames::parse(&text, class_num)?;
    tracing::debug!("Loaded {} class names from '{}'", names.len(), path.display());
    Ok(names)
}
