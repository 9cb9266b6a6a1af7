//! `tether-gen name`: print a derived proxy name.

use anyhow::Result;
use tether_codegen::proxy_name;

pub(crate) fn run_name(qualified: &str, package: &str) -> Result<bool> {
    println!("{}", proxy_name(qualified, package)?);
    Ok(true)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_name_outside_package_fails() {
        let err = run_name("other::Panel", "app::ui").unwrap_err();
        assert!(err.downcast_ref::<tether_codegen::NamingError>().is_some());
    }

    #[test]
    fn test_name_ok() {
        assert!(run_name("app::ui::Panel", "app::ui").unwrap());
    }
}
