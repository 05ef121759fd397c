/// Возвращает `Err(StackError)` из текущей функции, если условие ложно.
///
/// ```ignore
/// use fanout_error::{ensure, SettingsError};
///
/// fn validate(capacity: usize) -> fanout_error::FanoutResult<()> {
///     ensure!(
///         capacity > 0,
///         SettingsError::InvalidCapacity { field: "ingress_capacity", value: capacity, max: 1024 }
///     );
///     Ok(())
/// }
/// ```
#[macro_export]
macro_rules! ensure {
    ($cond:expr, $err:expr $(,)?) => {
        if !($cond) {
            return Err($crate::StackError::from($err));
        }
    };
}
