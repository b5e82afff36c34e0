/// Configuration macros for zero-repetition config definitions
///
/// The `config_struct!` macro defines a configuration struct together with
/// its default values in a single declaration.

/// Define a configuration struct with embedded defaults
///
/// Generates the struct with public fields, a `Default` implementation
/// using the declared values, and serde support with `#[serde(default)]`
/// so partial config files fall back to defaults field by field.
///
/// # Example
/// ```
/// pluginstore::config_struct! {
///     pub struct RetentionSettings {
///         performance_days: u32 = 90,
///         log_days: u32 = 60,
///     }
/// }
/// ```
#[macro_export]
macro_rules! config_struct {
    (
        $(#[$meta:meta])*
        $vis:vis struct $name:ident {
            $(
                $(#[$field_meta:meta])*
                $field_name:ident: $field_type:ty = $default_value:expr
            ),*
            $(,)?
        }
    ) => {
        $(#[$meta])*
        #[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
        #[serde(default)]
        $vis struct $name {
            $(
                $(#[$field_meta])*
                pub $field_name: $field_type,
            )*
        }

        impl Default for $name {
            fn default() -> Self {
                Self {
                    $(
                        $field_name: $default_value,
                    )*
                }
            }
        }
    };
}
