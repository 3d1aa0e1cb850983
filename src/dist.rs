//! Distribution source: a pluggable hook for packaging the generated build
//! tree into a distributable artifact (tarball, container layer, ...). Not
//! implemented by this crate, but the generator always calls through one
//! so that a future distribution backend is a matter of implementing the
//! trait, not touching `Generator`.

use crate::input::Input;
use crate::makefile::{Makefile, Rule};

/// Hooks invoked at fixed points of [`crate::generator::Generator::generate_makefile`].
pub trait DistSource {
    fn write_make_head(&self, _input: &Input, _mf: &mut Makefile) {}
    fn write_make_file(&self, _input: &Input, _mf: &mut Makefile) {}
    fn write_make_clean(&self, _input: &Input, _rule: &mut Rule) {}
}

/// The only backend shipped today: contributes nothing.
pub struct NullDistSource;

impl DistSource for NullDistSource {}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn null_source_leaves_makefile_untouched() {
        let input = Input {
            root_dir: "/repo".into(),
            current_path: "/repo".into(),
            object_dir: "$(OBJ_DIR)".into(),
            source_dir: "$(SRC_DIR)".into(),
            genfile_dir: "$(GEN_DIR)".into(),
            pkgfile_dir: "$(PKG_DIR)".into(),
            binary_dir: "$(BIN_DIR)".into(),
            silent_make: true,
            silent_gensh: false,
            jobs: 1,
            flags: HashMap::new(),
        };
        let mut mf = Makefile::new(true);
        NullDistSource.write_make_head(&input, &mut mf);
        NullDistSource.write_make_file(&input, &mut mf);
        assert!(mf.out().is_empty());
    }
}
