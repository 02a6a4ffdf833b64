// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

pub mod api_tests;
pub mod claims_test;
pub mod engine_lifecycle_test;
pub mod hard_reset_test;
pub mod helpers;
pub mod pause_resume_test;
