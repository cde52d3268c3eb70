//! Logging macros
//!
//! Each macro takes an optional list of `"key" => value` pairs after the
//! message. Values only need `Display`.

#[doc(hidden)]
#[macro_export]
macro_rules! __ur_dispatch {
    ($event:expr $(, $key:expr => $value:expr)*) => {{
        let event = $event;
        $(
            let event = event.with_context($key, &format!("{}", $value));
        )*
        $crate::logging::dispatch(event);
    }};
}

#[macro_export]
macro_rules! log_error {
    ($code:expr, $message:expr $(, $key:expr => $value:expr)* $(,)?) => {
        $crate::__ur_dispatch!(
            $crate::logging::LogEvent::error($code, $message)
            $(, $key => $value)*
        )
    };
}

/// Info-level milestone with an `I0xx` code
#[macro_export]
macro_rules! log_success {
    ($code:expr, $message:expr $(, $key:expr => $value:expr)* $(,)?) => {
        $crate::__ur_dispatch!(
            $crate::logging::LogEvent::success($code, $message)
            $(, $key => $value)*
        )
    };
}

#[macro_export]
macro_rules! log_info {
    ($message:expr $(, $key:expr => $value:expr)* $(,)?) => {
        $crate::__ur_dispatch!(
            $crate::logging::LogEvent::info($message)
            $(, $key => $value)*
        )
    };
}

#[macro_export]
macro_rules! log_warning {
    ($message:expr $(, $key:expr => $value:expr)* $(,)?) => {
        $crate::__ur_dispatch!(
            $crate::logging::LogEvent::warning($message)
            $(, $key => $value)*
        )
    };
}

/// Context values are not formatted unless debug events would be kept
#[macro_export]
macro_rules! log_debug {
    ($message:expr $(, $key:expr => $value:expr)* $(,)?) => {
        if $crate::logging::debug_enabled() {
            $crate::__ur_dispatch!(
                $crate::logging::LogEvent::debug($message)
                $(, $key => $value)*
            )
        }
    };
}
