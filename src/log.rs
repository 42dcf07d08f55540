#[cfg(feature = "log")]
#[allow(unused)]
#[macro_use]
mod log {
    macro_rules! trace {
        ($($args:tt)*) => { ::log::trace!($($args)*) }
    }

    macro_rules! debug {
        ($($args:tt)*) => { ::log::debug!($($args)*) }
    }

    macro_rules! info {
        ($($args:tt)*) => { ::log::info!($($args)*) }
    }

    macro_rules! warn {
        ($($args:tt)*) => { ::log::warn!($($args)*) }
    }
}

// Arguments are still type-checked and count as used without a logger.
#[cfg(not(feature = "log"))]
#[allow(unused)]
#[macro_use]
mod log {
    macro_rules! trace {
        ($($args:tt)*) => {{ let _ = format_args!($($args)*); }};
    }

    macro_rules! debug {
        ($($args:tt)*) => {{ let _ = format_args!($($args)*); }};
    }

    macro_rules! info {
        ($($args:tt)*) => {{ let _ = format_args!($($args)*); }};
    }

    macro_rules! warn {
        ($($args:tt)*) => {{ let _ = format_args!($($args)*); }};
    }
}
