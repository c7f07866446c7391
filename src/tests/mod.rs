// Test modules for Lekha-Terminal
// Each module covers the corresponding source file; shared fakes live in `helpers`

mod helpers;

mod body_tests;
mod provider_tests;
mod resilience_tests;
