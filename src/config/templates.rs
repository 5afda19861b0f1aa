//! Files written by `sandbox config init`.

pub const DEFAULT_CONFIG_YAML: &str = r#"# Sandbox configuration
# Global: ~/.sandbox/config.yaml
# Per-workspace: <workspace>/.sandbox/config.yaml
#
# Workspace settings are merged over global ones:
#   env      - workspace values win per key
#   sync     - a workspace rule replaces a global rule with the same dest
#   firewall - entries from both files are allowed
#   on_sync  - global hooks run first, then workspace hooks

sync:
  # Sync custom oh-my-zsh themes from host
  - src: ~/.oh-my-zsh/custom/themes/*.zsh-theme
    dest: ~/.oh-my-zsh/custom/themes/

# Written to ~/.sandbox-env in the container. "$NAME" copies NAME from the
# host environment at sync time (skipped if unset); "$$" escapes a literal "$".
env: {}

firewall:
  allow:
    # Claude API
    - domain: api.anthropic.com
    - domain: claude.ai
    - domain: statsig.anthropic.com
    - domain: sentry.io

    # npm / yarn / pnpm
    - domain: registry.npmjs.org
    - domain: registry.yarnpkg.com
    - domain: repo.yarnpkg.com

    # Go
    - domain: proxy.golang.org
    - domain: sum.golang.org
    - domain: storage.googleapis.com

    # Rust / crates.io
    - domain: crates.io
    - domain: static.crates.io
    - domain: index.crates.io
    - domain: static.rust-lang.org

    # PyPI
    - domain: pypi.org
    - domain: files.pythonhosted.org

    # GitHub
    - domain: github.com
    - domain: api.github.com
    - domain: raw.githubusercontent.com
    - domain: objects.githubusercontent.com
    - domain: codeload.github.com
    - domain: ghcr.io

    # CDNs
    - domain: cdn.jsdelivr.net
    - domain: deb.nodesource.com

# Commands run inside the container after every sync, in order. A failing
# hook fails the sync, and the next sync reruns every hook, so hooks should
# be safe to run more than once.
on_sync: []
#  - cmd: npm install
#    name: install dependencies
#    root: false
"#;

pub const DEFAULT_ZSHRC: &str = r#"export ZSH="$HOME/.oh-my-zsh"
ZSH_THEME="robbyrussell"
plugins=(git npm golang rust)
source $ZSH/oh-my-zsh.sh

# Files on the host in ~/.sandbox/home/bin/ are synced to ~/bin
# in the container. They need to be linux binaries to run.
export PATH="$HOME/bin:$PATH"

# Sandbox environment (managed by sandbox sync)
[ -f ~/.sandbox-env ] && source ~/.sandbox-env
"#;
