// Copyright (c) 2023 MASSA LABS <info@massa.net>

mod basic;
