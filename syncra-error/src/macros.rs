/// Возвращает `Err(StackError)` с [`GenericError`](crate::GenericError),
/// если условие ложно.
///
/// ```ignore
/// ensure!(max_pending > 0, StatusCode::InvalidConfig, "max_pending must be positive");
/// ensure!(is_known(level), StatusCode::InvalidConfig, "unknown level: {}", level);
/// ```
#[macro_export]
macro_rules! ensure {
    ($cond:expr, $code:expr, $($msg:tt)+) => {
        if !($cond) {
            return ::std::result::Result::Err($crate::StackError::new(
                $crate::GenericError::new($code, format!($($msg)+)),
            ));
        }
    };
}
