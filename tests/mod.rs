//! Test suite for the jukebox bot
//! Shared helpers live in `common`; scenario tests in `integration`
